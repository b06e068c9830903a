// Application state module
// Immutable per-process state shared by every connection

use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;

use super::types::Config;
use crate::error::ServerError;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Canonicalised directory being served
    pub root: PathBuf,
    /// Connections currently being served
    pub active_connections: AtomicUsize,
}

impl AppState {
    /// Create `AppState`, resolving the root directory once at startup
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let root_error = |source| ServerError::Root {
            path: config.server.root.clone(),
            source,
        };

        let root = std::fs::canonicalize(&config.server.root).map_err(root_error)?;
        if !root.is_dir() {
            return Err(root_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a directory",
            )));
        }

        Ok(Self {
            config,
            root,
            active_connections: AtomicUsize::new(0),
        })
    }
}
