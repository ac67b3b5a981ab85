//! TCP wire format for a single resumable file transfer.
//!
//! # Wire format
//!
//! ```text
//! HANDSHAKE (Client -> Server):
//!   [4 bytes BE: filename_len]
//!   [filename_len bytes: filename UTF-8]
//!   [8 bytes BE: file_size]
//!
//! RESUME (Server -> Client):  [8 bytes BE: resume_offset]
//!
//! PAYLOAD (Client -> Server): [file_size - resume_offset bytes: raw data]
//!
//! CHECKSUM (Client -> Server): [16 bytes: MD5 of the whole file]
//!
//! VERDICT (Server -> Client): [1 byte: 0x01=accept, 0x00=reject]
//! ```
//!
//! There are no other length prefixes; each side knows from protocol
//! state how many bytes come next.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::MAX_FILENAME_LEN;
use crate::checksum::FileDigest;
use crate::error::WireError;

/// Verdict byte: checksum matched.
pub const VERDICT_ACCEPT: u8 = 0x01;

/// Verdict byte: checksum mismatch.
pub const VERDICT_REJECT: u8 = 0x00;

/// The opening frame sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferHeader {
    /// Bare filename (no directory components).
    pub filename: String,
    /// Total size of the file the client intends to send.
    pub file_size: u64,
}

/// Outcome of the server's checksum comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

impl Verdict {
    pub fn from_match(matched: bool) -> Self {
        if matched { Verdict::Accept } else { Verdict::Reject }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Verdict::Accept => VERDICT_ACCEPT,
            Verdict::Reject => VERDICT_REJECT,
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self, WireError> {
        match byte {
            VERDICT_ACCEPT => Ok(Verdict::Accept),
            VERDICT_REJECT => Ok(Verdict::Reject),
            other => Err(WireError::Protocol(format!(
                "unknown verdict byte: 0x{other:02x}"
            ))),
        }
    }
}

/// Writes the handshake frame (filename + declared size).
pub async fn write_header<W: AsyncWrite + Unpin>(
    writer: &mut W,
    header: &TransferHeader,
) -> Result<(), WireError> {
    let name = header.filename.as_bytes();
    if name.len() > MAX_FILENAME_LEN {
        return Err(WireError::InvalidFilename(format!(
            "filename too long: {} bytes (max {MAX_FILENAME_LEN})",
            name.len()
        )));
    }

    writer.write_u32(name.len() as u32).await?;
    writer.write_all(name).await?;
    writer.write_u64(header.file_size).await?;
    Ok(())
}

/// Reads the handshake frame.
///
/// The filename is only checked for length and encoding here; whether it is
/// a safe bare name is decided by [`crate::validate_filename`].
pub async fn read_header<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<TransferHeader, WireError> {
    let name_len = reader
        .read_u32()
        .await
        .map_err(WireError::reading("filename_length"))? as usize;
    if name_len > MAX_FILENAME_LEN {
        return Err(WireError::Protocol(format!(
            "filename length {name_len} exceeds {MAX_FILENAME_LEN}"
        )));
    }

    let mut name_buf = vec![0u8; name_len];
    reader
        .read_exact(&mut name_buf)
        .await
        .map_err(WireError::reading("filename"))?;
    let filename = String::from_utf8(name_buf)
        .map_err(|e| WireError::Protocol(format!("invalid UTF-8 filename: {e}")))?;

    let file_size = reader
        .read_u64()
        .await
        .map_err(WireError::reading("file_size"))?;

    Ok(TransferHeader {
        filename,
        file_size,
    })
}

/// Writes the resume offset and flushes (the client is waiting on it).
pub async fn write_resume_offset<W: AsyncWrite + Unpin>(
    writer: &mut W,
    offset: u64,
) -> Result<(), WireError> {
    writer.write_u64(offset).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_resume_offset<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u64, WireError> {
    reader
        .read_u64()
        .await
        .map_err(WireError::reading("resume_offset"))
}

/// Writes the 16-byte whole-file digest and flushes.
pub async fn write_checksum<W: AsyncWrite + Unpin>(
    writer: &mut W,
    digest: &FileDigest,
) -> Result<(), WireError> {
    writer.write_all(digest).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_checksum<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<FileDigest, WireError> {
    let mut digest = [0u8; 16];
    reader
        .read_exact(&mut digest)
        .await
        .map_err(WireError::reading("checksum"))?;
    Ok(digest)
}

/// Writes the verdict byte and flushes.
pub async fn write_verdict<W: AsyncWrite + Unpin>(
    writer: &mut W,
    verdict: Verdict,
) -> Result<(), WireError> {
    writer.write_u8(verdict.as_byte()).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_verdict<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Verdict, WireError> {
    let byte = reader
        .read_u8()
        .await
        .map_err(WireError::reading("verdict"))?;
    Verdict::from_byte(byte)
}

/// Receives exactly `len` payload bytes from `reader` into `sink`.
///
/// Reads are bounded by `buf.len()` and each one by `timeout`; chunk
/// boundaries on the sender side are irrelevant. `on_chunk` is called with
/// the running total after every chunk has been handed to `sink`, so a
/// caller still knows how much landed when an error is returned.
pub async fn read_payload<R, W, F>(
    reader: &mut R,
    sink: &mut W,
    len: u64,
    buf: &mut [u8],
    timeout: Duration,
    mut on_chunk: F,
) -> Result<u64, WireError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    F: FnMut(u64),
{
    if buf.is_empty() && len > 0 {
        return Err(WireError::Protocol("payload buffer must not be empty".into()));
    }

    let mut received: u64 = 0;
    while received < len {
        let to_read = ((len - received) as usize).min(buf.len());
        let n = match tokio::time::timeout(timeout, reader.read(&mut buf[..to_read])).await {
            Ok(result) => result?,
            Err(_) => return Err(WireError::Timeout),
        };
        if n == 0 {
            return Err(WireError::Closed { field: "payload" });
        }

        sink.write_all(&buf[..n]).await?;
        received += n as u64;
        on_chunk(received);
    }

    Ok(received)
}
