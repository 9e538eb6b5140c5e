//! sandbox-exec sandbox (macOS)
//!
//! Generates a Scheme policy from the finalized allow-lists and invokes
//! `sandbox-exec -p <policy>`. Deprecated by Apple but still functional and
//! in production use by several major projects. Paths arrive already
//! realpath-resolved (so `/tmp` rules match `/private/tmp`).

use std::fmt::Write as _;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::platform::{Sandbox, WrappedCommand};
use crate::resolve::FinalizedSandboxConfig;

pub struct SeatbeltSandbox {
    config: FinalizedSandboxConfig,
}

impl SeatbeltSandbox {
    pub fn new(config: FinalizedSandboxConfig) -> Self {
        Self { config }
    }
}

/// Escape a path for embedding in a double-quoted Scheme string.
fn escape_policy_path(path: &str) -> String {
    path.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Generate the full sandbox-exec policy. Pure over the config.
pub fn seatbelt_policy(config: &FinalizedSandboxConfig) -> String {
    let mut policy = String::new();
    policy.push_str("(version 1)\n");
    policy.push_str("(import \"system.sb\")\n");
    policy.push_str("(deny default)\n");
    policy.push_str("(allow mach*)\n");
    policy.push_str("(allow ipc*)\n");
    policy.push_str("(allow signal (target others))\n");
    policy.push_str("(allow process-fork)\n");
    policy.push_str("(allow sysctl*)\n");
    policy.push_str("(allow system*)\n");
    policy.push_str("(allow file-read-metadata)\n");
    policy.push_str("(system-network)\n");

    for path in &config.allow_read {
        let escaped = escape_policy_path(&path.to_string_lossy());
        let _ = writeln!(policy, "(allow file-read* (subpath \"{escaped}/\"))");
    }
    for path in &config.allow_read_write {
        let escaped = escape_policy_path(&path.to_string_lossy());
        let _ = writeln!(policy, "(allow file-read* (subpath \"{escaped}/\"))");
        let _ = writeln!(policy, "(allow file-write* (subpath \"{escaped}/\"))");
        let _ = writeln!(policy, "(allow process-exec (subpath \"{escaped}/\"))");
    }
    if config.networking {
        policy.push_str("(allow network*)\n");
    }
    policy
}

#[async_trait]
impl Sandbox for SeatbeltSandbox {
    fn name(&self) -> &'static str {
        "sandbox-exec"
    }

    fn build_sandbox_args(&self, program: &str, args: &[String]) -> Option<WrappedCommand> {
        if !self.config.enabled {
            return None;
        }
        let mut wrapped_args = vec!["-p".to_string(), seatbelt_policy(&self.config)];
        wrapped_args.push(program.to_string());
        wrapped_args.extend(args.iter().cloned());
        Some(WrappedCommand {
            program: "sandbox-exec".to_string(),
            args: wrapped_args,
        })
    }

    async fn validate(&self) -> bool {
        let probe = Command::new("sandbox-exec")
            .args(["-p", "(version 1)(allow default)", "/usr/bin/true"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match probe {
            Ok(status) if status.success() => true,
            Ok(_) => {
                tracing::warn!("sandbox-exec probe failed; sandbox unavailable");
                false
            }
            Err(e) => {
                tracing::warn!("failed to execute sandbox-exec probe: {e}");
                false
            }
        }
    }
}
