//! `mcpadre run <server>`

use mcpadre_config::WorkspaceContext;

use crate::error::Result;

/// Run the named server and return the exit code to propagate.
pub async fn run_server_command(ctx: &WorkspaceContext, server_name: &str) -> Result<i32> {
    let outcome = mcpadre_run::run_server(ctx, server_name).await?;
    Ok(outcome.exit_code)
}
