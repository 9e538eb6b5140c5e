//! Error types for mcpadre-env

/// Result type for mcpadre-env operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while managing server environments
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Required tool {tool:?} is not available: {detail}")]
    PrereqMissing { tool: String, detail: String },

    #[error("Failed to install helper tool {tool:?}: {detail}")]
    PrereqInstallFailed { tool: String, detail: String },

    #[error(
        "Cannot decide between asdf and mise for {runtime} (resolved path: {path:?}); \
         set the version manager explicitly in config"
    )]
    VersionManagerAmbiguous {
        runtime: String,
        path: Option<String>,
    },

    #[error("Server {server:?} is not installed; run `mcpadre install` first")]
    NotInstalled { server: String },

    #[error("Install step {step:?} failed: {detail}")]
    InstallFailed { step: String, detail: String },

    #[error("Registry request failed: {message}")]
    Registry { message: String },

    #[error("Invalid container digest {digest:?}")]
    InvalidDigest { digest: String },

    #[error(transparent)]
    Config(#[from] mcpadre_config::Error),

    #[error(transparent)]
    Fs(#[from] mcpadre_fs::Error),
}
