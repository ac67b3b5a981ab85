//! Per-filename serialization of sessions.
//!
//! Two sessions writing the same destination file would corrupt each
//! other's resume offset, so a session holds the lock for its filename from
//! the moment the offset is computed until the verdict is sent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

type Slot = Arc<tokio::sync::Mutex<()>>;

/// Table of per-filename async locks. Cloning shares the table.
#[derive(Debug, Clone, Default)]
pub(crate) struct FilenameLocks {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

/// Held while a session owns a filename. Releases on drop.
#[derive(Debug)]
pub(crate) struct FilenameGuard {
    name: String,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl FilenameLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until no other session holds `name`, then takes it.
    pub(crate) async fn lock(&self, name: &str) -> FilenameGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(name.to_owned()).or_default())
        };
        let guard = slot.lock_owned().await;
        FilenameGuard {
            name: name.to_owned(),
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of filenames currently held or waited on.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for FilenameGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the table itself still references the slot: nobody waits.
        if slots
            .get(&self.name)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.name);
        }
    }
}
