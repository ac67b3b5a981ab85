//! Error types for the wire codec.

/// Errors produced while encoding or decoding protocol frames.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection before a complete field arrived.
    #[error("connection closed while reading {field}")]
    Closed { field: &'static str },

    #[error("timed out waiting for peer")]
    Timeout,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid filename: {0}")]
    InvalidFilename(String),
}

impl WireError {
    /// Maps an I/O error raised while reading `field`, turning a premature
    /// EOF into [`WireError::Closed`].
    pub fn reading(field: &'static str) -> impl FnOnce(std::io::Error) -> WireError {
        move |e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                WireError::Closed { field }
            } else {
                WireError::Io(e)
            }
        }
    }

    /// Returns `true` when the error means the connection itself failed
    /// (reset, premature close, timeout) rather than the peer speaking
    /// nonsense.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self,
            WireError::Io(_) | WireError::Closed { .. } | WireError::Timeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unexpected_eof_becomes_closed() {
        let err = std::io::Error::from(std::io::ErrorKind::UnexpectedEof);
        let mapped = WireError::reading("file_size")(err);
        assert!(matches!(mapped, WireError::Closed { field: "file_size" }));
        assert!(mapped.is_connection_failure());
    }

    #[test]
    fn other_io_errors_stay_io() {
        let err = std::io::Error::from(std::io::ErrorKind::ConnectionReset);
        let mapped = WireError::reading("verdict")(err);
        assert!(matches!(mapped, WireError::Io(_)));
    }

    #[test]
    fn protocol_errors_are_not_connection_failures() {
        assert!(!WireError::Protocol("bad verdict".into()).is_connection_failure());
        assert!(!WireError::InvalidFilename("..".into()).is_connection_failure());
    }
}
