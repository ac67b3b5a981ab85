//! TCP accept loop with a bounded pool of session tasks.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use filepush_protocol::Verdict;

use crate::ServerError;
use crate::config::ServerConfig;
use crate::locks::FilenameLocks;
use crate::session::{self, SessionContext, SessionOutcome};

/// The receiving server.
///
/// At most `max_workers` sessions run at once. A worker permit is taken
/// before `accept`, so clients beyond that wait in the listen backlog.
pub struct TransferServer {
    config: ServerConfig,
    ctx: SessionContext,
    workers: Arc<Semaphore>,
    max_workers: u32,
    cancel: CancellationToken,
}

impl TransferServer {
    pub fn new(config: ServerConfig, cancel: CancellationToken) -> Arc<Self> {
        let max_workers = config
            .max_workers
            .clamp(1, Semaphore::MAX_PERMITS.min(u32::MAX as usize)) as u32;
        let ctx = SessionContext {
            root_dir: config.root_dir.clone(),
            chunk_size: config.chunk_size.max(1),
            socket_timeout: config.socket_timeout(),
            locks: FilenameLocks::new(),
        };
        Arc::new(Self {
            config,
            ctx,
            workers: Arc::new(Semaphore::new(max_workers as usize)),
            max_workers,
            cancel,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Stops accepting; in-flight sessions finish on their own.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Binds the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        info!(%addr, root = %self.config.root_dir.display(), "transfer server listening");
        Ok(listener)
    }

    /// Binds and serves until shutdown.
    pub async fn run(self: &Arc<Self>) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accepts connections on `listener` until shutdown, then waits for
    /// in-flight sessions to drain.
    pub async fn serve(self: &Arc<Self>, listener: TcpListener) -> Result<(), ServerError> {
        loop {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&self.workers).acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = listener.accept() => match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                },
            };

            let server = Arc::clone(self);
            tokio::spawn(async move {
                let _permit = permit;
                server.handle_connection(stream, peer).await;
            });
        }

        drop(listener);
        info!("transfer server shutting down, draining sessions");
        let _ = self.workers.acquire_many(self.max_workers).await;
        info!("transfer server stopped");
        Ok(())
    }

    /// Runs one session over an already established stream.
    ///
    /// Sessions share this server's root directory, timeouts and filename
    /// locks, but do not take a worker permit.
    pub async fn serve_connection<S>(&self, stream: S) -> Result<SessionOutcome, ServerError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        session::handle_session(stream, &self.ctx).await
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        info!(%peer, "connection accepted");

        match self.serve_connection(stream).await {
            Ok(outcome) => {
                let s = &outcome.session;
                match outcome.verdict {
                    Verdict::Accept => info!(
                        %peer,
                        filename = %s.filename,
                        size = s.declared_size,
                        resumed_from = s.on_disk_offset,
                        bytes_received = s.bytes_received,
                        "transfer accepted"
                    ),
                    Verdict::Reject => warn!(
                        %peer,
                        filename = %s.filename,
                        size = s.declared_size,
                        "transfer rejected"
                    ),
                }
            }
            Err(e) => error!(%peer, "session failed: {e}"),
        }

        debug!(%peer, "connection closed");
    }
}
