//! Bubblewrap sandbox (Linux)
//!
//! Wraps the launch command in `bwrap` with fresh user/pid/ipc/uts/cgroup
//! namespaces, all capabilities dropped, and explicit bind mounts derived
//! from the finalized allow-lists. Network isolation unshares the network
//! namespace entirely.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::platform::{Sandbox, WrappedCommand};
use crate::resolve::FinalizedSandboxConfig;

/// Stderr fragments that indicate AppArmor is blocking unprivileged user
/// namespaces rather than bwrap itself being broken.
const APPARMOR_SYMPTOMS: [&str; 4] = [
    "Operation not permitted",
    "setting up uid map: Permission denied",
    "No permissions to create new namespace",
    "loopback: Failed RTM_NEWADDR",
];

pub struct BubblewrapSandbox {
    config: FinalizedSandboxConfig,
}

impl BubblewrapSandbox {
    pub fn new(config: FinalizedSandboxConfig) -> Self {
        Self { config }
    }
}

/// Generate the full `bwrap` argv for one launch. Pure over the config.
pub fn bwrap_args(
    config: &FinalizedSandboxConfig,
    program: &str,
    args: &[String],
) -> Vec<String> {
    let mut argv: Vec<String> = vec![
        "--new-session".into(),
        "--die-with-parent".into(),
        "--unshare-user".into(),
        "--unshare-pid".into(),
        "--unshare-ipc".into(),
        "--unshare-uts".into(),
        "--unshare-cgroup".into(),
        "--cap-drop".into(),
        "ALL".into(),
        "--hostname".into(),
        "sandbox".into(),
    ];
    if !config.networking {
        argv.push("--unshare-net".into());
    }
    argv.extend(["--proc".into(), "/proc".into()]);
    argv.extend(["--dev".into(), "/dev".into()]);
    argv.extend(["--tmpfs".into(), "/tmp".into()]);

    for path in &config.allow_read {
        let p = path.to_string_lossy().into_owned();
        argv.extend(["--ro-bind".into(), p.clone(), p]);
    }
    for path in &config.allow_read_write {
        let p = path.to_string_lossy().into_owned();
        argv.extend(["--bind".into(), p.clone(), p]);
    }

    argv.push("--".into());
    argv.push(program.to_string());
    argv.extend(args.iter().cloned());
    argv
}

#[async_trait]
impl Sandbox for BubblewrapSandbox {
    fn name(&self) -> &'static str {
        "bubblewrap"
    }

    fn build_sandbox_args(&self, program: &str, args: &[String]) -> Option<WrappedCommand> {
        if !self.config.enabled {
            return None;
        }
        Some(WrappedCommand {
            program: "bwrap".to_string(),
            args: bwrap_args(&self.config, program, args),
        })
    }

    async fn validate(&self) -> bool {
        let Ok(binary) = which::which("bwrap") else {
            tracing::warn!("bwrap not found on PATH; sandbox unavailable");
            return false;
        };

        let probe = Command::new(&binary)
            .args(["--ro-bind", "/", "/", "--unshare-net", "/bin/true"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match probe {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if APPARMOR_SYMPTOMS.iter().any(|s| stderr.contains(s)) {
                    tracing::warn!(
                        "bwrap failed its probe; this usually means AppArmor restricts \
                         unprivileged user namespaces. Try: sudo sysctl -w \
                         kernel.apparmor_restrict_unprivileged_userns=0, or install an \
                         AppArmor profile for bwrap."
                    );
                } else {
                    tracing::warn!(stderr = %stderr.trim(), "bwrap probe failed");
                }
                false
            }
            Err(e) => {
                tracing::warn!("failed to execute bwrap probe: {e}");
                false
            }
        }
    }
}
