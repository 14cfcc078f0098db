//! Unified error handling for the client engine.
//!
//! Line-level parse failures never show up here: they are downgraded to
//! `MessageKind::Unknown` by the classifier. Everything in [`ClientError`]
//! ends a connection, or is returned from a handle call on a connection
//! that has already ended.

use slirc_proto::ProtocolError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that terminate a connection or reject a handle call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connect to {host}:{port} timed out after {secs}s")]
    ConnectTimeout { host: String, port: u16, secs: u64 },

    #[error("tls setup failed: {0}")]
    Tls(String),

    /// Framing violation by the server (e.g. an oversized line).
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("no data from server for {ticks} keep-alive ticks")]
    PingTimeout { ticks: u32 },

    /// The server sent `ERROR` and is closing the link.
    #[error("server closed link: {0}")]
    ServerError(String),

    #[error("session closed")]
    SessionClosed,

    #[error("unknown server: {0}")]
    UnknownServer(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io_error",
            Self::ConnectTimeout { .. } => "connect_timeout",
            Self::Tls(_) => "tls_error",
            Self::Protocol(_) => "protocol_violation",
            Self::PingTimeout { .. } => "ping_timeout",
            Self::ServerError(_) => "server_error",
            Self::SessionClosed => "session_closed",
            Self::UnknownServer(_) => "unknown_server",
            Self::Config(_) => "config_error",
        }
    }

    /// True for errors caused by the remote end rather than by us.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Protocol(_) | Self::PingTimeout { .. } | Self::ServerError(_)
        )
    }
}

/// Result type for engine operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(ClientError::SessionClosed.error_code(), "session_closed");
        assert_eq!(
            ClientError::PingTimeout { ticks: 12 }.error_code(),
            "ping_timeout"
        );
        let err: ClientError = ProtocolError::MessageTooLong {
            actual: 600,
            limit: 510,
        }
        .into();
        assert_eq!(err.error_code(), "protocol_violation");
        assert!(err.is_remote());
    }

    #[test]
    fn display_includes_cause() {
        let err = ClientError::ConnectTimeout {
            host: "irc.example.net".into(),
            port: 6697,
            secs: 30,
        };
        assert_eq!(
            err.to_string(),
            "connect to irc.example.net:6697 timed out after 30s"
        );
        assert!(!err.is_remote());
    }
}
