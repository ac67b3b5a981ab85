//! Wire protocol shared by the filepush client and server.
//!
//! One TCP connection carries one resumable file transfer:
//! handshake (name + size), resume offset, raw payload, whole-file MD5
//! and a one-byte verdict. See [`wire`] for the exact byte layout.

pub mod checksum;
pub mod error;
pub mod validation;
pub mod wire;

pub use checksum::{FileDigest, digest_hex, md5_bytes, md5_file};
pub use error::WireError;
pub use validation::validate_filename;
pub use wire::{TransferHeader, Verdict};

use std::time::Duration;

/// Default payload chunk size (64 KiB).
///
/// Only a tuning knob: receivers never rely on chunk boundaries.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Default timeout applied to every blocking socket operation.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(30);

/// Default TCP port of the server.
pub const DEFAULT_PORT: u16 = 5001;

/// Longest filename accepted on the wire, in bytes.
pub const MAX_FILENAME_LEN: usize = 4096;
