//! Shell environment manager
//!
//! Shell servers own no materialized state: the configured command is
//! template-resolved and handed to the system shell. Drift never occurs.

use async_trait::async_trait;
use mcpadre_config::ShellSpec;

use crate::Result;
use crate::provider::{
    DriftReport, EnvironmentProvider, LaunchSpec, ProviderContext, UpgradePolicy,
};

pub struct ShellProvider {
    spec: ShellSpec,
}

impl ShellProvider {
    pub fn new(spec: ShellSpec) -> Self {
        Self { spec }
    }
}

/// The system shell used to interpret shell commands.
fn system_shell() -> (&'static str, &'static str) {
    if cfg!(windows) {
        ("cmd.exe", "/C")
    } else {
        ("/bin/sh", "-c")
    }
}

#[async_trait]
impl EnvironmentProvider for ShellProvider {
    fn kind(&self) -> &'static str {
        "shell"
    }

    async fn ensure_prerequisites(&self, _ctx: &ProviderContext) -> Result<()> {
        Ok(())
    }

    async fn detect_drift(
        &self,
        _ctx: &ProviderContext,
        _policy: UpgradePolicy,
    ) -> Result<DriftReport> {
        Ok(DriftReport::sync())
    }

    async fn materialize(&self, _ctx: &ProviderContext, _report: &DriftReport) -> Result<()> {
        Ok(())
    }

    async fn build_launch(&self, ctx: &ProviderContext) -> Result<LaunchSpec> {
        // `command` arrives already template-resolved; the runner
        // substitutes bindings before constructing this provider. Shell
        // servers own no server directory, so they run at the workspace
        // root.
        let (shell, flag) = system_shell();
        Ok(LaunchSpec {
            program: shell.to_string(),
            args: vec![flag.to_string(), self.spec.command.as_str().to_string()],
            cwd: ctx.workspace_root.to_native(),
            env: ctx.child_env(),
        })
    }
}
