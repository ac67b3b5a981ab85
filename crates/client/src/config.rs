//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use filepush_protocol::{DEFAULT_CHUNK_SIZE, DEFAULT_SOCKET_TIMEOUT};

/// Tuning of a [`crate::TransferClient`]. Not part of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Payload chunk size.
    pub chunk_size: usize,

    /// Timeout for connect and every socket read/write, in milliseconds.
    pub socket_timeout_ms: u64,

    /// Connection attempts per file (at least 1).
    pub max_attempts: u32,

    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            socket_timeout_ms: DEFAULT_SOCKET_TIMEOUT.as_millis() as u64,
            max_attempts: 3,
            retry_delay_ms: 5_000,
        }
    }
}

impl ClientConfig {
    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
