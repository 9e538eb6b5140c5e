//! Error types for mcpadre-fs

use std::path::PathBuf;

/// Result type for mcpadre-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mcpadre-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Lock acquisition timed out for {path}")]
    LockTimeout { path: PathBuf },

    #[error("Invalid server name: {name:?}")]
    InvalidServerName { name: String },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
