//! mcpadre CLI
//!
//! The dependency-and-configuration broker between MCP clients and MCP
//! servers: `run` proxies a configured server over stdio, `install`
//! materializes the pinned server environments.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    let cli = Cli::parse();

    // All human-facing logging goes to stderr; stdout belongs to the
    // JSON-RPC stream.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    match runtime.block_on(execute(cli)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn execute(cli: Cli) -> Result<i32> {
    let ctx = context::open_workspace(&cli)?;
    match &cli.command {
        Commands::Run { server_name } => commands::run_server_command(&ctx, server_name).await,
        Commands::Install {
            force,
            skip_gitignore,
        } => commands::run_install(&ctx, *force, *skip_gitignore).await,
    }
}
