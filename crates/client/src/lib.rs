//! Sending side of the filepush protocol.
//!
//! [`TransferClient`] delivers one file per call, reconnecting and resuming
//! from the server's on-disk offset after connection failures, bounded by a
//! fixed attempt budget. Batches are sequences of independent transfers.

mod batch;
mod client;
mod config;
mod connector;
mod retry;

pub use batch::{BatchPolicy, BatchReport, FileResult};
pub use client::{Progress, TransferClient, TransferReport};
pub use config::ClientConfig;
pub use connector::{ConnectFuture, Connector, TcpConnector};
pub use retry::{AttemptState, RetryBudget};

use std::path::PathBuf;

use filepush_protocol::WireError;

/// Errors produced while sending a file.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("local I/O error on {}: {source}", .path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error("server rejected {filename}: checksum mismatch")]
    Rejected { filename: String },

    #[error("gave up after {attempts} attempts: {last}")]
    AttemptsExhausted {
        attempts: u32,
        #[source]
        last: Box<ClientError>,
    },

    #[error("cancelled")]
    Cancelled,
}

impl ClientError {
    pub(crate) fn local(path: &std::path::Path, source: std::io::Error) -> Self {
        ClientError::LocalIo {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns `true` for network transience worth another attempt.
    ///
    /// Local I/O problems, rejections and protocol violations are terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Connect(_) => true,
            ClientError::Wire(e) => e.is_connection_failure(),
            _ => false,
        }
    }
}
