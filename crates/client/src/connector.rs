//! Transport seam of the client.
//!
//! The retry controller only needs "give me a fresh byte stream to the
//! server". Production code dials TCP; tests plug in in-memory or
//! deliberately failing streams.

use std::future::Future;
use std::io;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// A boxed future returned by [`Connector::connect`].
pub type ConnectFuture<'a, S> = Pin<Box<dyn Future<Output = io::Result<S>> + Send + 'a>>;

/// Opens a new connection to the server for every attempt.
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    fn connect(&self) -> ConnectFuture<'_, Self::Stream>;

    /// Human-readable peer description for logs.
    fn peer(&self) -> &str;
}

/// Dials `host:port` over TCP.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            addr: format!("{host}:{port}"),
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self) -> ConnectFuture<'_, TcpStream> {
        Box::pin(dial(&self.addr))
    }

    fn peer(&self) -> &str {
        &self.addr
    }
}

async fn dial(addr: &str) -> io::Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}
