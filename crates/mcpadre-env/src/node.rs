//! Node environment manager
//!
//! Materializes `<serverDir>/package.json` with the one configured package
//! pinned to its exact version, installs through pnpm (npm as fallback),
//! and launches the package's binary through the manager's `exec`.

use async_trait::async_trait;
use mcpadre_config::NodeSpec;
use serde_json::json;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::provider::{
    DriftReport, EnvironmentProvider, LaunchSpec, ProviderContext, UpgradePolicy,
    is_version_downgrade,
};
use crate::version_manager::{determine_reshim_action, reshim};

/// Which package manager drives installs and launches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Pnpm,
    Npm,
}

impl PackageManager {
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Pnpm => "pnpm",
            Self::Npm => "npm",
        }
    }
}

pub struct NodeEnvProvider {
    spec: NodeSpec,
}

impl NodeEnvProvider {
    pub fn new(spec: NodeSpec) -> Self {
        Self { spec }
    }

    /// Render the dependency manifest for this spec.
    pub fn manifest(&self, server_name: &str) -> String {
        let mut dependencies = serde_json::Map::new();
        dependencies.insert(
            self.spec.package.clone(),
            serde_json::Value::String(self.spec.version.clone()),
        );
        let manifest = json!({
            "name": format!("mcpadre-deps-{server_name}"),
            "private": true,
            "dependencies": dependencies,
        });
        let mut rendered = serde_json::to_string_pretty(&manifest).expect("manifest serializes");
        rendered.push('\n');
        rendered
    }

    /// The installed version pin recorded in an existing package.json.
    fn installed_version(&self, content: &str) -> Option<String> {
        let manifest: serde_json::Value = serde_json::from_str(content).ok()?;
        manifest
            .get("dependencies")?
            .get(&self.spec.package)?
            .as_str()
            .map(str::to_string)
    }

    /// pnpm when available, npm otherwise.
    fn select_manager(&self) -> Result<PackageManager> {
        if which::which("pnpm").is_ok() {
            Ok(PackageManager::Pnpm)
        } else if which::which("npm").is_ok() {
            Ok(PackageManager::Npm)
        } else {
            Err(Error::PrereqMissing {
                tool: "pnpm".to_string(),
                detail: "neither pnpm nor npm found on PATH".to_string(),
            })
        }
    }
}

/// The executable name an npm package exposes: the unscoped name.
pub fn package_bin_name(package: &str) -> &str {
    package.rsplit('/').next().unwrap_or(package)
}

#[async_trait]
impl EnvironmentProvider for NodeEnvProvider {
    fn kind(&self) -> &'static str {
        "node"
    }

    async fn ensure_prerequisites(&self, ctx: &ProviderContext) -> Result<()> {
        let node_version = crate::probe::probe_output(Command::new("node").arg("--version"))
            .await
            .map_err(|e| Error::PrereqMissing {
                tool: "node".to_string(),
                detail: e.to_string(),
            })?;
        if !node_version.status.success() {
            return Err(Error::PrereqMissing {
                tool: "node".to_string(),
                detail: "node --version failed".to_string(),
            });
        }

        if which::which("pnpm").is_ok() {
            return Ok(());
        }

        // One in-place install through the base runtime, then reshim so the
        // version manager's shims pick it up.
        tracing::info!("pnpm not found, installing via npm");
        let install = Command::new("npm")
            .args(["install", "-g", "pnpm"])
            .output()
            .await
            .map_err(|e| Error::PrereqInstallFailed {
                tool: "pnpm".to_string(),
                detail: e.to_string(),
            })?;
        if !install.status.success() {
            return Err(Error::PrereqInstallFailed {
                tool: "pnpm".to_string(),
                detail: String::from_utf8_lossy(&install.stderr).trim().to_string(),
            });
        }

        let node_path = which::which("node").ok();
        let action = determine_reshim_action(
            ctx.options.node_version_manager,
            "node",
            node_path.as_deref(),
        )?;
        reshim(action, "node").await
    }

    async fn detect_drift(
        &self,
        ctx: &ProviderContext,
        policy: UpgradePolicy,
    ) -> Result<DriftReport> {
        let manifest_path = ctx.server_dir.join("package.json");
        if !manifest_path.is_file() {
            return Ok(DriftReport::create());
        }

        let content = mcpadre_fs::io::read_text(&manifest_path)?;
        let installed = self.installed_version(&content);
        match installed {
            Some(version) if version == self.spec.version => Ok(DriftReport::sync()),
            installed => {
                let downgrade = installed
                    .as_deref()
                    .is_some_and(|old| is_version_downgrade(old, &self.spec.version));
                let old = installed.unwrap_or_else(|| "(absent)".to_string());
                let change = format!(
                    "Package version: {}@{} → {}@{}",
                    self.spec.package, old, self.spec.package, self.spec.version
                );
                Ok(DriftReport::changed(vec![change], policy.permits(downgrade)))
            }
        }
    }

    async fn materialize(&self, ctx: &ProviderContext, report: &DriftReport) -> Result<()> {
        use crate::provider::DriftAction;
        match report.action {
            DriftAction::Skip => return Ok(()),
            DriftAction::Sync => {
                let has_modules = ctx.server_dir.join("node_modules").is_dir();
                let has_lockfile = ctx.server_dir.join("pnpm-lock.yaml").is_file()
                    || ctx.server_dir.join("package-lock.json").is_file();
                if has_modules && has_lockfile {
                    return Ok(());
                }
            }
            DriftAction::Create | DriftAction::Upgrade => {}
        }

        let manifest_path = ctx.server_dir.join("package.json");
        mcpadre_fs::io::write_text_if_changed(&manifest_path, &self.manifest(&ctx.server_name))?;

        let manager = self.select_manager()?;
        let install = Command::new(manager.binary())
            .arg("install")
            .current_dir(ctx.server_dir.to_native())
            .output()
            .await
            .map_err(|e| Error::InstallFailed {
                step: format!("{} install", manager.binary()),
                detail: e.to_string(),
            })?;
        if !install.status.success() {
            return Err(Error::InstallFailed {
                step: format!("{} install", manager.binary()),
                detail: String::from_utf8_lossy(&install.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    async fn build_launch(&self, ctx: &ProviderContext) -> Result<LaunchSpec> {
        let manager = self.select_manager()?;
        let bin = package_bin_name(&self.spec.package);
        let args = match manager {
            PackageManager::Pnpm => vec!["exec".to_string(), bin.to_string()],
            PackageManager::Npm => {
                vec!["exec".to_string(), "--".to_string(), bin.to_string()]
            }
        };
        Ok(LaunchSpec {
            program: manager.binary().to_string(),
            args,
            cwd: ctx.server_dir.to_native(),
            env: ctx.child_env(),
        })
    }
}
