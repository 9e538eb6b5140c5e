//! Error types for mcpadre-sandbox

/// Result type for mcpadre-sandbox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or validating a sandbox
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Sandbox unavailable on this platform: {reason}")]
    SandboxUnavailable { reason: String },

    #[error(transparent)]
    Config(#[from] mcpadre_config::Error),
}
