//! The `run <server>` orchestrator
//!
//! Strictly sequential: resolve the server spec, check the environment
//! under a shared lock, finalize and validate the sandbox, spawn, attach
//! the pipeline, and exit with the child's code. `run` only ever performs
//! SYNC; a directory that needs a CREATE means the server was never
//! installed.

use std::time::Duration;

use mcpadre_config::{RuntimeSpec, ShellSpec, WorkspaceContext, resolve_env_map,
    resolve_template};
use mcpadre_env::{DriftAction, ProviderContext, UpgradePolicy, provider_for};
use mcpadre_fs::{LockMode, ServerLock, WorkspaceLayout};
use mcpadre_sandbox::{
    OsPathProbe, SandboxWorkspace, create_sandbox, resolve_sandbox_config,
};

use crate::command::ServerCommand;
use crate::error::{Error, Result};
use crate::http_bridge::run_http_bridge;
use crate::pipeline::{Pipeline, PipelineOptions};

/// Grace window between a termination request and the force-kill.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// What `run` finished with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: i32,
}

/// Execute one configured server, proxying JSON-RPC over our own stdio.
pub async fn run_server(ctx: &WorkspaceContext, server_name: &str) -> Result<RunOutcome> {
    let spec = ctx.settings().server(server_name)?.clone();
    let layout = WorkspaceLayout::new(ctx.root().clone());

    let pipeline_options = PipelineOptions {
        log_traffic: ctx.settings().options.log_mcp_traffic,
        traffic_log_path: ctx.settings().options.log_mcp_traffic.then(|| {
            let date = chrono::Utc::now().format("%Y-%m-%d");
            layout
                .logs_dir()
                .join(&format!("{server_name}-{date}.log"))
                .to_native()
        }),
    };

    // Remote servers have no child process; bridge and return.
    if let RuntimeSpec::Http(http) = &spec.runtime {
        let url = resolve_template(&http.url, ctx.dirs(), ctx.parent_env())?;
        let headers = resolve_env_map(&http.headers, ctx.dirs(), ctx.parent_env())?;
        return run_http_bridge(&url, &headers, pipeline_options).await;
    }

    // Shell commands resolve their template before the provider sees them.
    let runtime = match &spec.runtime {
        RuntimeSpec::Shell(shell) => RuntimeSpec::Shell(ShellSpec {
            command: resolve_template(shell.command.as_str(), ctx.dirs(), ctx.parent_env())?
                .into(),
        }),
        other => other.clone(),
    };

    let provider = provider_for(&runtime).expect("non-http runtime has a provider");

    let server_dir = layout.server_dir(server_name)?;
    let _lock = if runtime.has_server_directory() {
        let lock_path = layout.server_lock_path(server_name)?;
        Some(ServerLock::acquire_default(&lock_path, LockMode::Shared)?)
    } else {
        None
    };

    let provider_ctx = ProviderContext {
        server_name: server_name.to_string(),
        workspace_root: ctx.root().clone(),
        server_dir: server_dir.clone(),
        parent_env: ctx.parent_env().clone(),
        resolved_env: resolve_env_map(&spec.env, ctx.dirs(), ctx.parent_env())?,
        options: ctx.settings().options.clone(),
    };

    provider.ensure_prerequisites(&provider_ctx).await?;

    let policy = UpgradePolicy {
        allow_implicit: ctx.settings().allows_implicit_upgrade(&spec),
        force: false,
    };
    let drift = provider.detect_drift(&provider_ctx, policy).await?;
    match drift.action {
        DriftAction::Create => {
            return Err(Error::Env(mcpadre_env::Error::NotInstalled {
                server: server_name.to_string(),
            }));
        }
        DriftAction::Sync => {
            provider.materialize(&provider_ctx, &drift).await?;
        }
        DriftAction::Upgrade | DriftAction::Skip => {
            // Upgrades belong to `install`; run with what is on disk.
            for change in &drift.changes {
                tracing::warn!("configured spec differs from installed state: {change}");
            }
            provider
                .materialize(&provider_ctx, &mcpadre_env::DriftReport::sync())
                .await?;
        }
    }

    let sandbox_config = spec.sandbox.clone().unwrap_or_default();
    let workspace = SandboxWorkspace {
        dirs: ctx.dirs(),
        parent_env: ctx.parent_env(),
        options: &ctx.settings().options,
        server_dir: runtime.has_server_directory().then(|| server_dir.clone()),
    };
    let finalized = resolve_sandbox_config(&sandbox_config, &workspace, &OsPathProbe)?;
    let sandbox_enabled = finalized.enabled;
    let sandbox = create_sandbox(finalized);
    if sandbox_enabled && !sandbox.validate().await {
        return Err(mcpadre_sandbox::Error::SandboxUnavailable {
            reason: format!("{} failed its validation probe", sandbox.name()),
        }
        .into());
    }

    let launch = provider.build_launch(&provider_ctx).await?;
    let mut process = ServerCommand::new(launch).sandboxed(sandbox).spawn()?;

    let child_in = process.take_stdin().expect("stdin piped");
    let child_out = process.take_stdout().expect("stdout piped");
    let pipeline = Pipeline::new(pipeline_options);

    tokio::select! {
        summary = pipeline.run(tokio::io::stdin(), tokio::io::stdout(), child_in, child_out) => {
            summary?;
        }
        _ = wait_for_termination() => {
            tracing::debug!("termination signal received, shutting down server");
            process.shutdown(SHUTDOWN_GRACE).await?;
            return Err(Error::UserCancelled);
        }
    }

    // The pipeline drained; give the child a moment to exit on its own.
    let exit_code = match tokio::time::timeout(Duration::from_millis(500), process.wait()).await {
        Ok(code) => code?,
        Err(_) => process.shutdown(SHUTDOWN_GRACE).await?,
    };
    Ok(RunOutcome { exit_code })
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(_) => return std::future::pending::<()>().await,
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}
