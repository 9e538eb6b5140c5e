//! Error types for mcpadre-config

use std::path::PathBuf;

/// Result type for mcpadre-config operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or resolving configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to parse {format} config at {path}: {message}")]
    ConfigInvalid {
        path: PathBuf,
        format: String,
        message: String,
    },

    #[error("No mcpadre config file found (searched upward from {start})")]
    ConfigMissing { start: PathBuf },

    #[error("Multiple mcpadre config files in {dir}: {found:?}")]
    ConfigAmbiguous { dir: PathBuf, found: Vec<String> },

    #[error("Server {name:?} is not defined in the merged configuration")]
    ServerUnknown { name: String },

    #[error("Template {template:?} references unknown binding {token:?}")]
    TemplateUnresolved { template: String, token: String },

    #[error("Cannot resolve {dir} directory on this system")]
    DirUnavailable { dir: &'static str },

    #[error(transparent)]
    Fs(#[from] mcpadre_fs::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
