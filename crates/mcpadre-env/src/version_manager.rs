//! Version-manager probe and reshim
//!
//! After a helper tool (pnpm, uv) is installed through the base runtime,
//! asdf/mise shims go stale until a `reshim`. The probe decides which
//! manager owns the runtime; `auto` classifies the `which`-resolved binary
//! path by substring and refuses to guess when both managers appear in it.

use std::path::Path;
use std::process::Stdio;

use mcpadre_config::VersionManagerConfig;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Which reshim to run after a helper install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReshimAction {
    Asdf,
    Mise,
    None,
}

/// Decide the reshim action from the configured manager and the resolved
/// runtime binary path.
pub fn determine_reshim_action(
    config: VersionManagerConfig,
    runtime: &str,
    which_path: Option<&Path>,
) -> Result<ReshimAction> {
    match config {
        VersionManagerConfig::None => Ok(ReshimAction::None),
        VersionManagerConfig::Asdf => Ok(ReshimAction::Asdf),
        VersionManagerConfig::Mise => Ok(ReshimAction::Mise),
        VersionManagerConfig::Auto => {
            let Some(path) = which_path else {
                return Err(Error::VersionManagerAmbiguous {
                    runtime: runtime.to_string(),
                    path: None,
                });
            };
            let path_str = path.to_string_lossy();
            let has_asdf = path_str.contains("asdf");
            let has_mise = path_str.contains("mise");
            match (has_asdf, has_mise) {
                (true, true) => Err(Error::VersionManagerAmbiguous {
                    runtime: runtime.to_string(),
                    path: Some(path_str.into_owned()),
                }),
                (true, false) => Ok(ReshimAction::Asdf),
                (false, true) => Ok(ReshimAction::Mise),
                (false, false) => Ok(ReshimAction::None),
            }
        }
    }
}

/// Run `<manager> reshim <runtime>`. Sequential, no retries; a failing
/// reshim is surfaced, not swallowed.
pub async fn reshim(action: ReshimAction, runtime: &str) -> Result<()> {
    let manager = match action {
        ReshimAction::Asdf => "asdf",
        ReshimAction::Mise => "mise",
        ReshimAction::None => return Ok(()),
    };

    tracing::debug!(manager, runtime, "running reshim");
    let output = Command::new(manager)
        .args(["reshim", runtime])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| Error::PrereqInstallFailed {
            tool: manager.to_string(),
            detail: e.to_string(),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(Error::PrereqInstallFailed {
            tool: manager.to_string(),
            detail: format!(
                "reshim {runtime} exited {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        })
    }
}
