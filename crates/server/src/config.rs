//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use filepush_protocol::{DEFAULT_CHUNK_SIZE, DEFAULT_PORT, DEFAULT_SOCKET_TIMEOUT};

/// Static configuration of a [`crate::TransferServer`].
///
/// None of these values are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub host: String,

    /// TCP port (0 = OS-assigned).
    pub port: u16,

    /// Directory received files are written into.
    pub root_dir: PathBuf,

    /// Receive buffer size per session.
    pub chunk_size: usize,

    /// Timeout for every blocking socket operation, in seconds.
    pub socket_timeout_secs: u64,

    /// Maximum number of sessions handled at once.
    pub max_workers: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            root_dir: PathBuf::from("."),
            chunk_size: DEFAULT_CHUNK_SIZE,
            socket_timeout_secs: DEFAULT_SOCKET_TIMEOUT.as_secs(),
            max_workers: 10,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_secs(self.socket_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:5001");
        assert_eq!(config.root_dir, PathBuf::from("."));
        assert_eq!(config.chunk_size, 64 * 1024);
        assert_eq!(config.socket_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_workers, 10);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str("port = 9000\nmax_workers = 2").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.chunk_size, 64 * 1024);
    }

    #[test]
    fn toml_roundtrip() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 7000,
            root_dir: PathBuf::from("/srv/incoming"),
            chunk_size: 4096,
            socket_timeout_secs: 5,
            max_workers: 4,
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: ServerConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
