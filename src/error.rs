//! Startup error types
//!
//! Everything here is fatal: the process logs the error to stderr and exits
//! with a non-zero status. Per-request failures never surface as a
//! `ServerError`; they become HTTP status codes in the handler layer.

use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration sources could not be read or deserialized.
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    /// `server.host` and `server.port` do not form a socket address.
    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),

    /// The directory to serve is missing or not accessible.
    #[error("cannot serve directory '{path}': {source}")]
    Root {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Port already in use, permission denied, address not available.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A configured log file could not be opened.
    #[error("failed to initialize logger: {0}")]
    Logger(#[source] std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
