//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// mcpadre - run MCP servers in pinned, sandboxed environments
#[derive(Parser, Debug)]
#[command(name = "mcpadre")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log verbosity on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Operate on the user scope instead of the project workspace
    #[arg(long, global = true)]
    pub user: bool,

    /// Override the user scope directory (defaults to $MCPADRE_USER_DIR or
    /// ~/.mcpadre)
    #[arg(long, global = true, value_name = "PATH", env = "MCPADRE_USER_DIR")]
    pub user_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run a configured MCP server, proxying JSON-RPC over stdio
    ///
    /// The server must have been installed first. The client (editor or
    /// chat host) speaks line-delimited JSON-RPC on our stdin/stdout.
    Run {
        /// Name of the server as configured under mcpServers
        server_name: String,
    },

    /// Materialize the environments of all configured servers
    ///
    /// Creates missing server directories, syncs unchanged ones, and
    /// upgrades changed ones when policy allows.
    Install {
        /// Apply detected changes even when implicit upgrades are off
        #[arg(long)]
        force: bool,

        /// Do not touch the workspace .gitignore
        #[arg(long)]
        skip_gitignore: bool,
    },
}

/// Verbosity levels for --log-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lower")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["mcpadre", "run", "memory"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Run {
                server_name: "memory".to_string()
            }
        );
        assert!(!cli.user);
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_parse_run_with_flags() {
        let cli = Cli::try_parse_from([
            "mcpadre",
            "run",
            "memory",
            "--log-level",
            "debug",
            "--user",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(cli.user);
    }

    #[test]
    fn test_parse_install_force() {
        let cli = Cli::try_parse_from(["mcpadre", "install", "--force"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Install {
                force: true,
                skip_gitignore: false
            }
        );
    }

    #[test]
    fn test_run_requires_server_name() {
        assert!(Cli::try_parse_from(["mcpadre", "run"]).is_err());
    }
}
