//! Whole-file MD5 digests.
//!
//! The protocol verifies a transfer by comparing the MD5 of the complete
//! file, never just the resumed tail.

use std::path::Path;

use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;

/// Raw 16-byte MD5 digest as carried on the wire.
pub type FileDigest = [u8; 16];

/// Read buffer used while hashing files.
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Computes the MD5 of `data`.
pub fn md5_bytes(data: &[u8]) -> FileDigest {
    Md5::digest(data).into()
}

/// Computes the MD5 of the entire file at `path`.
pub async fn md5_file(path: &Path) -> std::io::Result<FileDigest> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; HASH_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

/// Lowercase hex form of a digest, for logs.
pub fn digest_hex(digest: &FileDigest) -> String {
    hex::encode(digest)
}
