//! Attempt state machine and retry budget.
//!
//! ```text
//! Idle -> Connecting -> Handshaking -> Streaming -> Verifying -> Done
//!              |             |             |            |
//!              +-------------+------+------+------------+
//!                                   v
//!                            Retry | Failed
//! Retry -> Connecting
//! ```

use std::fmt;
use std::time::Duration;

use tracing::debug;

/// Where a single file transfer currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Connecting,
    Handshaking,
    Streaming,
    Verifying,
    Done,
    Retry,
    Failed,
}

impl AttemptState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptState::Done | AttemptState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(self, next: AttemptState) -> bool {
        use AttemptState::*;
        match (self, next) {
            (Idle | Retry, Connecting) => true,
            (Connecting, Handshaking) => true,
            (Handshaking, Streaming) => true,
            (Streaming, Verifying) => true,
            (Verifying, Done) => true,
            (Connecting | Handshaking | Streaming | Verifying, Retry | Failed) => true,
            // Local preconditions or cancellation between attempts.
            (Idle | Retry, Failed) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttemptState::Idle => "idle",
            AttemptState::Connecting => "connecting",
            AttemptState::Handshaking => "handshaking",
            AttemptState::Streaming => "streaming",
            AttemptState::Verifying => "verifying",
            AttemptState::Done => "done",
            AttemptState::Retry => "retry",
            AttemptState::Failed => "failed",
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state of one file's transfer, logging every transition.
#[derive(Debug)]
pub(crate) struct StateTracker {
    filename: String,
    state: AttemptState,
}

impl StateTracker {
    pub(crate) fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_owned(),
            state: AttemptState::Idle,
        }
    }

    pub(crate) fn state(&self) -> AttemptState {
        self.state
    }

    pub(crate) fn set(&mut self, next: AttemptState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        debug!(filename = %self.filename, from = %self.state, to = %next, "state");
        self.state = next;
    }
}

/// Bounded number of connection attempts with a fixed delay between them.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    max_attempts: u32,
    delay: Duration,
    used: u32,
}

impl RetryBudget {
    /// `max_attempts` below 1 is raised to 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            used: 0,
        }
    }

    /// Consumes one attempt and returns its 1-based number.
    ///
    /// The first call is always within budget; callers check
    /// [`RetryBudget::is_exhausted`] before starting another.
    pub fn begin(&mut self) -> u32 {
        self.used = self.used.saturating_add(1);
        self.used
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}
