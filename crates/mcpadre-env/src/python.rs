//! Python environment manager
//!
//! Materializes a uv-driven environment: `pyproject.toml` with the single
//! pinned dependency, `.python-version` / `.tool-versions` interpreter
//! pins, and a `.venv` kept current by `uv sync`.

use async_trait::async_trait;
use mcpadre_config::PythonSpec;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::provider::{
    DriftAction, DriftReport, EnvironmentProvider, LaunchSpec, ProviderContext, UpgradePolicy,
    is_version_downgrade,
};
use crate::pyproject::{PyprojectFields, generate_pyproject, parse_pyproject};
use crate::registry::pypi_requires_python;
use crate::version_manager::{determine_reshim_action, reshim};

pub struct PythonEnvProvider {
    spec: PythonSpec,
}

impl PythonEnvProvider {
    pub fn new(spec: PythonSpec) -> Self {
        Self { spec }
    }

    /// The `requires-python` expression this spec should materialize.
    ///
    /// Precedence: explicit `pythonVersion` pin, then the release's PyPI
    /// `requires_python` when recognizable, then the system interpreter's
    /// `>=X.Y`.
    async fn desired_requires_python(&self) -> Result<String> {
        if let Some(pin) = &self.spec.python_version {
            return Ok(format!("=={pin}"));
        }
        if let Some(raw) = pypi_requires_python(&self.spec.package, &self.spec.version).await {
            if let Some(normalized) = normalize_requires_python(&raw) {
                return Ok(normalized);
            }
            tracing::debug!(raw = %raw, "unrecognizable requires_python from PyPI, falling back");
        }
        system_requires_python().await
    }

    /// Compare an existing manifest against this spec, one stable line per
    /// changed axis.
    fn change_lines(&self, installed: &PyprojectFields, desired_requires: &str) -> Vec<String> {
        let mut changes = Vec::new();
        if installed.requires_python != desired_requires {
            changes.push(format!(
                "Python version: {} → {}",
                installed.requires_python, desired_requires
            ));
        }
        let desired_dependency = format!("{}=={}", self.spec.package, self.spec.version);
        if installed.dependency != desired_dependency {
            changes.push(format!(
                "Package version: {} → {}",
                installed.dependency, desired_dependency
            ));
        }
        changes
    }

    /// The interpreter version written to `.python-version`: the exact pin
    /// when one exists, otherwise the system interpreter's version.
    async fn interpreter_version(&self) -> Result<String> {
        if let Some(pin) = &self.spec.python_version {
            return Ok(pin.clone());
        }
        let (version, _) = system_python_version().await?;
        Ok(version)
    }
}

/// Validate and normalize a PyPI `requires_python` string. Unrecognizable
/// values yield `None` so callers fall back to the system interpreter.
pub fn normalize_requires_python(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let specifier =
        regex::Regex::new(r"^(==|>=|<=|~=|!=|>|<)\s*[0-9][0-9A-Za-z.*]*$").expect("valid pattern");
    let all_valid = trimmed
        .split(',')
        .map(str::trim)
        .all(|part| specifier.is_match(part));
    all_valid.then(|| {
        trimmed
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(",")
    })
}

/// The full version and `>=X.Y` expression of the system interpreter.
async fn system_python_version() -> Result<(String, String)> {
    let binary = python_binary()?;
    let output = crate::probe::probe_output(Command::new(&binary).arg("--version"))
        .await
        .map_err(|e| Error::PrereqMissing {
            tool: "python".to_string(),
            detail: e.to_string(),
        })?;
    let text = String::from_utf8_lossy(&output.stdout);
    let text = if text.trim().is_empty() {
        String::from_utf8_lossy(&output.stderr)
    } else {
        text
    };

    let version = text
        .trim()
        .strip_prefix("Python ")
        .map(str::to_string)
        .ok_or_else(|| Error::PrereqMissing {
            tool: "python".to_string(),
            detail: format!("unexpected --version output: {}", text.trim()),
        })?;
    let minor = version
        .split('.')
        .take(2)
        .collect::<Vec<_>>()
        .join(".");
    Ok((version, format!(">={minor}")))
}

async fn system_requires_python() -> Result<String> {
    system_python_version().await.map(|(_, expr)| expr)
}

fn python_binary() -> Result<std::path::PathBuf> {
    which::which("python3")
        .or_else(|_| which::which("python"))
        .map_err(|e| Error::PrereqMissing {
            tool: "python".to_string(),
            detail: e.to_string(),
        })
}

#[async_trait]
impl EnvironmentProvider for PythonEnvProvider {
    fn kind(&self) -> &'static str {
        "python"
    }

    async fn ensure_prerequisites(&self, ctx: &ProviderContext) -> Result<()> {
        let binary = python_binary()?;
        let version = crate::probe::probe_output(Command::new(&binary).arg("--version"))
            .await
            .map_err(|e| Error::PrereqMissing {
                tool: "python".to_string(),
                detail: e.to_string(),
            })?;
        if !version.status.success() {
            return Err(Error::PrereqMissing {
                tool: "python".to_string(),
                detail: "python --version failed".to_string(),
            });
        }

        if which::which("uv").is_ok() {
            return Ok(());
        }

        tracing::info!("uv not found, installing via pip");
        let install = Command::new(&binary)
            .args(["-m", "pip", "install", "uv"])
            .output()
            .await
            .map_err(|e| Error::PrereqInstallFailed {
                tool: "uv".to_string(),
                detail: e.to_string(),
            })?;
        if !install.status.success() {
            return Err(Error::PrereqInstallFailed {
                tool: "uv".to_string(),
                detail: String::from_utf8_lossy(&install.stderr).trim().to_string(),
            });
        }

        let action = determine_reshim_action(
            ctx.options.python_version_manager,
            "python",
            Some(binary.as_path()),
        )?;
        reshim(action, "python").await
    }

    async fn detect_drift(
        &self,
        ctx: &ProviderContext,
        policy: UpgradePolicy,
    ) -> Result<DriftReport> {
        let manifest_path = ctx.server_dir.join("pyproject.toml");
        if !manifest_path.is_file() {
            return Ok(DriftReport::create());
        }

        let installed = parse_pyproject(&mcpadre_fs::io::read_text(&manifest_path)?)?;
        let desired_requires = self.desired_requires_python().await?;
        let changes = self.change_lines(&installed, &desired_requires);
        if changes.is_empty() {
            Ok(DriftReport::sync())
        } else {
            let downgrade = installed
                .dependency
                .split_once("==")
                .is_some_and(|(_, old)| is_version_downgrade(old, &self.spec.version));
            Ok(DriftReport::changed(changes, policy.permits(downgrade)))
        }
    }

    async fn materialize(&self, ctx: &ProviderContext, report: &DriftReport) -> Result<()> {
        match report.action {
            DriftAction::Skip => return Ok(()),
            DriftAction::Sync => {
                let venv_current = ctx.server_dir.join(".venv").is_dir()
                    && ctx.server_dir.join("uv.lock").is_file();
                if venv_current {
                    return Ok(());
                }
            }
            DriftAction::Create | DriftAction::Upgrade => {}
        }

        let requires_python = self.desired_requires_python().await?;
        let manifest = generate_pyproject(
            &ctx.server_name,
            &self.spec.package,
            &self.spec.version,
            &requires_python,
        );
        mcpadre_fs::io::write_text_if_changed(&ctx.server_dir.join("pyproject.toml"), &manifest)?;

        let interpreter = self.interpreter_version().await?;
        mcpadre_fs::io::write_text_if_changed(
            &ctx.server_dir.join(".python-version"),
            &format!("{interpreter}\n"),
        )?;
        mcpadre_fs::io::write_text_if_changed(
            &ctx.server_dir.join(".tool-versions"),
            &format!("python {interpreter}\n"),
        )?;

        let sync = Command::new("uv")
            .arg("sync")
            .current_dir(ctx.server_dir.to_native())
            .output()
            .await
            .map_err(|e| Error::InstallFailed {
                step: "uv sync".to_string(),
                detail: e.to_string(),
            })?;
        if !sync.status.success() {
            return Err(Error::InstallFailed {
                step: "uv sync".to_string(),
                detail: String::from_utf8_lossy(&sync.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    async fn build_launch(&self, ctx: &ProviderContext) -> Result<LaunchSpec> {
        Ok(LaunchSpec {
            program: "uv".to_string(),
            args: vec!["run".to_string(), "--".to_string(), self.spec.package.clone()],
            cwd: ctx.server_dir.to_native(),
            env: ctx.child_env(),
        })
    }
}
