//! Workspace context construction from CLI flags

use mcpadre_config::WorkspaceContext;

use crate::cli::Cli;
use crate::error::Result;

/// Open the workspace the flags point at: the user scope with `--user`,
/// otherwise the project workspace containing the current directory.
pub fn open_workspace(cli: &Cli) -> Result<WorkspaceContext> {
    let env: std::collections::HashMap<String, String> = std::env::vars().collect();
    let ctx = if cli.user {
        WorkspaceContext::open_user(env, cli.user_dir.as_deref())?
    } else {
        let cwd = std::env::current_dir()?;
        WorkspaceContext::open_project(&cwd, env)?
    };
    Ok(ctx)
}
