//! Error types for mcpadre-run

/// Result type for mcpadre-run operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while executing a server
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to spawn {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server process failed with exit code {exit_code}")]
    ProcessFailed {
        exit_code: i32,
        stderr_tail: Vec<String>,
    },

    #[error("Pipeline I/O error: {0}")]
    PipelineIo(#[from] std::io::Error),

    #[error("Cancelled by user")]
    UserCancelled,

    #[error(transparent)]
    Sandbox(#[from] mcpadre_sandbox::Error),

    #[error(transparent)]
    Config(#[from] mcpadre_config::Error),

    #[error(transparent)]
    Env(#[from] mcpadre_env::Error),

    #[error(transparent)]
    Fs(#[from] mcpadre_fs::Error),
}
