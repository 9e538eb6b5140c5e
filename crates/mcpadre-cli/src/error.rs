//! Error types and exit-code mapping for the CLI

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Run(#[from] mcpadre_run::Error),

    #[error(transparent)]
    Config(#[from] mcpadre_config::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// The process exit code this error maps to: 2 for configuration
    /// problems, 3 when a required sandbox is unavailable, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Run(mcpadre_run::Error::Config(_)) => 2,
            Self::Run(mcpadre_run::Error::Sandbox(sandbox)) => match sandbox {
                mcpadre_sandbox::Error::SandboxUnavailable { .. } => 3,
                mcpadre_sandbox::Error::Config(_) => 2,
            },
            Self::Run(mcpadre_run::Error::UserCancelled) => 1,
            _ => 1,
        }
    }
}
