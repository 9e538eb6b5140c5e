//! The `install` flow
//!
//! Materializes every configured server (or one) under the per-server
//! exclusive lock, applying the upgrade policy: changes are only written
//! when the per-server override, the global option, or `--force` permits.

use mcpadre_config::{WorkspaceContext, resolve_env_map};
use mcpadre_env::{DriftAction, ProviderContext, UpgradePolicy, provider_for};
use mcpadre_fs::{LockMode, ServerLock, WorkspaceLayout};

use crate::error::Result;

/// What happened to one server during `install`.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub server: String,
    pub action: DriftAction,
    pub changes: Vec<String>,
}

impl InstallReport {
    /// Whether the caller should print the skipped-change hint.
    pub fn was_skipped(&self) -> bool {
        self.action == DriftAction::Skip
    }
}

/// Install or sync one server. Returns what was done.
pub async fn install_server(
    ctx: &WorkspaceContext,
    server_name: &str,
    force: bool,
) -> Result<InstallReport> {
    let spec = ctx.settings().server(server_name)?.clone();
    let layout = WorkspaceLayout::new(ctx.root().clone());

    // Http servers have nothing to materialize.
    let Some(provider) = provider_for(&spec.runtime) else {
        return Ok(InstallReport {
            server: server_name.to_string(),
            action: DriftAction::Sync,
            changes: Vec::new(),
        });
    };

    let _lock = if spec.runtime.has_server_directory() {
        let server_dir = layout.ensure_server_dir(server_name)?;
        tracing::debug!(dir = %server_dir.as_str(), "materializing server environment");
        let lock_path = layout.server_lock_path(server_name)?;
        Some(ServerLock::acquire_default(&lock_path, LockMode::Exclusive)?)
    } else {
        None
    };

    let provider_ctx = ProviderContext {
        server_name: server_name.to_string(),
        workspace_root: ctx.root().clone(),
        server_dir: layout.server_dir(server_name)?,
        parent_env: ctx.parent_env().clone(),
        resolved_env: resolve_env_map(&spec.env, ctx.dirs(), ctx.parent_env())?,
        options: ctx.settings().options.clone(),
    };

    provider.ensure_prerequisites(&provider_ctx).await?;

    let policy = UpgradePolicy {
        allow_implicit: ctx.settings().allows_implicit_upgrade(&spec),
        force,
    };
    let drift = provider.detect_drift(&provider_ctx, policy).await?;
    provider.materialize(&provider_ctx, &drift).await?;

    Ok(InstallReport {
        server: server_name.to_string(),
        action: drift.action,
        changes: drift.changes,
    })
}

/// Install or sync every configured server, in name order.
pub async fn install_all(ctx: &WorkspaceContext, force: bool) -> Result<Vec<InstallReport>> {
    let names: Vec<String> = ctx.settings().servers.keys().cloned().collect();
    let mut reports = Vec::with_capacity(names.len());
    for name in names {
        reports.push(install_server(ctx, &name, force).await?);
    }
    Ok(reports)
}
