//! One connection, one transfer: handshake, payload, checksum, verdict.

use std::future::Future;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use filepush_protocol::wire::{
    read_checksum, read_header, read_payload, write_resume_offset, write_verdict,
};
use filepush_protocol::{Verdict, WireError, digest_hex, md5_file, validate_filename};

use crate::ServerError;
use crate::locks::FilenameLocks;

/// Server-side state of a single connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSession {
    pub filename: String,
    /// Size the client declared in the handshake.
    pub declared_size: u64,
    /// Bytes already on disk when the session started (the resume offset).
    pub on_disk_offset: u64,
    /// Payload bytes received over this connection.
    pub bytes_received: u64,
}

/// Result of a session that reached the verdict step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session: TransferSession,
    pub verdict: Verdict,
}

/// Settings shared by every session of a server.
#[derive(Debug, Clone)]
pub(crate) struct SessionContext {
    pub(crate) root_dir: PathBuf,
    pub(crate) chunk_size: usize,
    pub(crate) socket_timeout: Duration,
    pub(crate) locks: FilenameLocks,
}

/// Drives one complete session over `stream`.
///
/// Any error is fatal for the session; the destination file keeps whatever
/// was written so the next connection for the same name can resume.
pub(crate) async fn handle_session<S>(
    stream: S,
    ctx: &SessionContext,
) -> Result<SessionOutcome, ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::with_capacity(ctx.chunk_size.max(1), reader);

    let header = timed(ctx.socket_timeout, read_header(&mut reader)).await?;
    validate_filename(&header.filename)?;

    let _guard = ctx.locks.lock(&header.filename).await;

    let path = ctx.root_dir.join(&header.filename);
    let offset = resume_offset(&path, header.file_size).await?;
    let mut session = TransferSession {
        filename: header.filename,
        declared_size: header.file_size,
        on_disk_offset: offset,
        bytes_received: 0,
    };

    info!(
        filename = %session.filename,
        size = session.declared_size,
        offset,
        "receiving file"
    );

    timed(ctx.socket_timeout, write_resume_offset(&mut writer, offset)).await?;

    let mut file = open_destination(&path, offset).await?;
    let mut buf = vec![0u8; ctx.chunk_size.max(1)];
    let received = read_payload(
        &mut reader,
        &mut file,
        session.declared_size - offset,
        &mut buf,
        ctx.socket_timeout,
        |total| session.bytes_received = total,
    )
    .await;

    // Persist what arrived even when the connection dropped mid-stream.
    let flushed = file.flush().await;
    drop(file);
    if let Err(e) = received {
        warn!(
            filename = %session.filename,
            on_disk = session.on_disk_offset + session.bytes_received,
            "payload incomplete: {e}"
        );
        return Err(e.into());
    }
    flushed?;

    debug!(
        filename = %session.filename,
        bytes = session.bytes_received,
        "payload received"
    );

    let expected = timed(ctx.socket_timeout, read_checksum(&mut reader)).await?;
    let actual = md5_file(&path).await?;
    let verdict = Verdict::from_match(actual == expected);

    if verdict == Verdict::Reject {
        warn!(
            filename = %session.filename,
            expected = %digest_hex(&expected),
            actual = %digest_hex(&actual),
            "checksum mismatch"
        );
    }

    timed(ctx.socket_timeout, write_verdict(&mut writer, verdict)).await?;

    Ok(SessionOutcome { session, verdict })
}

/// Returns how many bytes of `path` can be trusted as a prefix of a file of
/// `declared_size` bytes.
///
/// A missing file resumes from 0. A file longer than the declared size is
/// stale and also resumes from 0.
pub(crate) async fn resume_offset(path: &Path, declared_size: u64) -> Result<u64, ServerError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => {
            let len = meta.len();
            if len > declared_size {
                warn!(
                    path = %path.display(),
                    on_disk = len,
                    declared_size,
                    "partial file larger than declared size, restarting"
                );
                Ok(0)
            } else {
                Ok(len)
            }
        }
        Ok(_) => Err(ServerError::Io(std::io::Error::other(format!(
            "destination is not a regular file: {}",
            path.display()
        )))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Opens the destination for writing at `offset`.
///
/// Offset 0 truncates, so a stale longer file cannot leave trailing bytes.
async fn open_destination(path: &Path, offset: u64) -> std::io::Result<tokio::fs::File> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(offset == 0)
        .open(path)
        .await?;
    if offset > 0 {
        file.seek(SeekFrom::Start(offset)).await?;
    }
    Ok(file)
}

/// Bounds a codec step by the socket timeout.
async fn timed<T, F>(timeout: Duration, fut: F) -> Result<T, WireError>
where
    F: Future<Output = Result<T, WireError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(WireError::Timeout),
    }
}
