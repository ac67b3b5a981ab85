//! Resumable single-file sender.

use std::future::Future;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use filepush_protocol::wire::{
    read_resume_offset, read_verdict, write_checksum, write_header,
};
use filepush_protocol::{
    FileDigest, TransferHeader, Verdict, WireError, digest_hex, md5_file, validate_filename,
};

use crate::ClientError;
use crate::config::ClientConfig;
use crate::connector::Connector;
use crate::retry::{AttemptState, RetryBudget, StateTracker};

/// Progress of the file currently being sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub filename: String,
    /// Absolute position in the file confirmed handed to the socket.
    pub position: u64,
    pub file_size: u64,
}

/// Summary of a successful transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub filename: String,
    pub file_size: u64,
    /// Offset the server reported on the attempt that succeeded.
    pub resumed_from: u64,
    /// Payload bytes sent on the attempt that succeeded.
    pub bytes_sent: u64,
    /// Connection attempts used, including the successful one.
    pub attempts: u32,
}

/// Client-side view of one file across all of its attempts.
#[derive(Debug)]
struct TransferAttempt {
    file_path: PathBuf,
    filename: String,
    file_size: u64,
    md5_digest: FileDigest,
    /// Highest position known to have reached the server. Never decreases.
    local_offset: u64,
}

impl TransferAttempt {
    /// Checks local preconditions and hashes the file once.
    async fn prepare(path: &Path) -> Result<Self, ClientError> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| ClientError::local(path, e))?;
        if !meta.is_file() {
            return Err(ClientError::NotAFile(path.to_path_buf()));
        }

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ClientError::InvalidFilename(path.display().to_string()))?
            .to_owned();
        validate_filename(&filename).map_err(|e| ClientError::InvalidFilename(e.to_string()))?;

        let md5_digest = md5_file(path)
            .await
            .map_err(|e| ClientError::local(path, e))?;

        Ok(Self {
            file_path: path.to_path_buf(),
            filename,
            file_size: meta.len(),
            md5_digest,
            local_offset: 0,
        })
    }

    fn advance(&mut self, position: u64) {
        self.local_offset = self.local_offset.max(position);
    }
}

/// What one connection achieved before its verdict.
struct AttemptOutcome {
    resumed_from: u64,
    bytes_sent: u64,
    verdict: Verdict,
}

/// Sends files to one server, resuming across reconnects.
pub struct TransferClient<C: Connector> {
    connector: C,
    config: ClientConfig,
    cancel: CancellationToken,
    progress_tx: Option<mpsc::Sender<Progress>>,
}

impl<C: Connector> TransferClient<C> {
    pub fn new(connector: C, config: ClientConfig) -> Self {
        Self {
            connector,
            config,
            cancel: CancellationToken::new(),
            progress_tx: None,
        }
    }

    /// Aborts in-flight and pending transfers when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reports progress after every chunk (non-blocking, may drop events).
    pub fn with_progress(mut self, progress_tx: mpsc::Sender<Progress>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Delivers one file.
    ///
    /// Connection-level failures are retried after the configured delay
    /// until the attempt budget is spent; each retry re-queries the server's
    /// offset. A reject verdict is terminal.
    pub async fn send_file(&self, path: &Path) -> Result<TransferReport, ClientError> {
        // A cancelled client never starts hashing.
        let prepared = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
            prepared = TransferAttempt::prepare(path) => prepared,
        };
        let mut attempt = match prepared {
            Ok(a) => a,
            Err(ClientError::Cancelled) => return Err(ClientError::Cancelled),
            Err(e) => {
                error!(path = %path.display(), "cannot send file: {e}");
                return Err(e);
            }
        };

        info!(
            filename = %attempt.filename,
            size = attempt.file_size,
            md5 = %digest_hex(&attempt.md5_digest),
            server = %self.connector.peer(),
            "sending file"
        );

        let mut budget = RetryBudget::new(self.config.max_attempts, self.config.retry_delay());
        let mut state = StateTracker::new(&attempt.filename);

        loop {
            let number = budget.begin();
            debug!(filename = %attempt.filename, attempt = number, "starting attempt");

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
                result = self.run_attempt(&mut attempt, &mut state) => result,
            };

            let err = match result {
                Ok(outcome) if outcome.verdict == Verdict::Accept => {
                    state.set(AttemptState::Done);
                    info!(
                        filename = %attempt.filename,
                        attempts = number,
                        resumed_from = outcome.resumed_from,
                        "transfer accepted by server"
                    );
                    return Ok(TransferReport {
                        filename: attempt.filename,
                        file_size: attempt.file_size,
                        resumed_from: outcome.resumed_from,
                        bytes_sent: outcome.bytes_sent,
                        attempts: number,
                    });
                }
                Ok(_) => {
                    state.set(AttemptState::Failed);
                    error!(filename = %attempt.filename, "server reported checksum mismatch");
                    return Err(ClientError::Rejected {
                        filename: attempt.filename,
                    });
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                state.set(AttemptState::Failed);
                error!(filename = %attempt.filename, attempt = number, "transfer failed: {err}");
                return Err(err);
            }

            if budget.is_exhausted() {
                state.set(AttemptState::Failed);
                error!(
                    filename = %attempt.filename,
                    attempts = number,
                    "giving up: {err}"
                );
                return Err(ClientError::AttemptsExhausted {
                    attempts: number,
                    last: Box::new(err),
                });
            }

            state.set(AttemptState::Retry);
            warn!(
                filename = %attempt.filename,
                attempt = number,
                remaining = budget.remaining(),
                sent = attempt.local_offset,
                "attempt failed, retrying in {:?}: {err}",
                budget.delay()
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    state.set(AttemptState::Failed);
                    return Err(ClientError::Cancelled);
                }
                _ = tokio::time::sleep(budget.delay()) => {}
            }
        }
    }

    /// One connection: handshake, payload from the server's offset,
    /// checksum, verdict.
    async fn run_attempt(
        &self,
        attempt: &mut TransferAttempt,
        state: &mut StateTracker,
    ) -> Result<AttemptOutcome, ClientError> {
        let timeout = self.config.socket_timeout();

        state.set(AttemptState::Connecting);
        let stream = match tokio::time::timeout(timeout, self.connector.connect()).await {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => return Err(ClientError::Connect(e)),
            Err(_) => {
                return Err(ClientError::Connect(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "connect timed out",
                )));
            }
        };
        debug!(server = %self.connector.peer(), "connected");

        let (mut reader, writer) = tokio::io::split(stream);
        let mut writer = BufWriter::with_capacity(self.config.chunk_size.max(1), writer);

        state.set(AttemptState::Handshaking);
        let header = TransferHeader {
            filename: attempt.filename.clone(),
            file_size: attempt.file_size,
        };
        timed(timeout, async {
            write_header(&mut writer, &header).await?;
            writer.flush().await?;
            Ok::<(), WireError>(())
        })
        .await?;

        let server_offset = timed(timeout, read_resume_offset(&mut reader)).await?;
        if server_offset > attempt.file_size {
            return Err(WireError::Protocol(format!(
                "server resume offset {server_offset} exceeds file size {}",
                attempt.file_size
            ))
            .into());
        }
        if server_offset < attempt.local_offset {
            warn!(
                filename = %attempt.filename,
                server_offset,
                local_offset = attempt.local_offset,
                "server kept fewer bytes than were sent, resending from its offset"
            );
        }
        attempt.advance(server_offset);
        info!(filename = %attempt.filename, offset = server_offset, "server resume offset");

        state.set(AttemptState::Streaming);
        let bytes_sent = self
            .stream_payload(&mut writer, attempt, server_offset)
            .await?;
        debug!(filename = %attempt.filename, bytes_sent, "payload sent");

        state.set(AttemptState::Verifying);
        timed(timeout, write_checksum(&mut writer, &attempt.md5_digest)).await?;
        let verdict = timed(timeout, read_verdict(&mut reader)).await?;

        Ok(AttemptOutcome {
            resumed_from: server_offset,
            bytes_sent,
            verdict,
        })
    }

    /// Streams `[start, file_size)` of the local file in bounded chunks.
    async fn stream_payload<W: AsyncWrite + Unpin>(
        &self,
        writer: &mut W,
        attempt: &mut TransferAttempt,
        start: u64,
    ) -> Result<u64, ClientError> {
        let path = attempt.file_path.clone();
        let local = |e| ClientError::local(&path, e);
        let timeout = self.config.socket_timeout();

        let mut file = tokio::fs::File::open(&path).await.map_err(local)?;
        file.seek(SeekFrom::Start(start)).await.map_err(local)?;

        let mut buf = vec![0u8; self.config.chunk_size.max(1)];
        let mut position = start;
        while position < attempt.file_size {
            let to_read = ((attempt.file_size - position) as usize).min(buf.len());
            let n = file.read(&mut buf[..to_read]).await.map_err(local)?;
            if n == 0 {
                return Err(local(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "file shrank while sending",
                )));
            }

            // Flushed per chunk so `position` only counts bytes the socket took.
            timed(timeout, async {
                writer.write_all(&buf[..n]).await?;
                writer.flush().await?;
                Ok::<(), WireError>(())
            })
            .await?;

            position += n as u64;
            attempt.advance(position);

            if let Some(tx) = &self.progress_tx {
                let _ = tx.try_send(Progress {
                    filename: attempt.filename.clone(),
                    position,
                    file_size: attempt.file_size,
                });
            }
        }

        Ok(position - start)
    }
}

/// Bounds a codec step by the socket timeout.
async fn timed<T, F>(timeout: Duration, fut: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, WireError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(WireError::Timeout.into()),
    }
}
