//! Receiving side of the filepush protocol.
//!
//! Accepts concurrent TCP connections, each carrying one resumable file
//! transfer, and writes the files into a configured directory. A bounded
//! pool of session tasks does the work; one bad session never stops the
//! accept loop.

mod config;
mod locks;
mod server;
mod session;

pub use config::ServerConfig;
pub use server::TransferServer;
pub use session::{SessionOutcome, TransferSession};

use filepush_protocol::WireError;

/// Errors produced by the transfer server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Wire(#[from] WireError),
}
