//! Sandbox trait and platform factory

use async_trait::async_trait;

use crate::bwrap::BubblewrapSandbox;
use crate::passthrough::PassthroughSandbox;
use crate::resolve::FinalizedSandboxConfig;
use crate::seatbelt::SeatbeltSandbox;

/// A launch command rewritten to run under a sandbox wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedCommand {
    pub program: String,
    pub args: Vec<String>,
}

/// One platform isolation mechanism.
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    /// Wrap the target command, or `None` to run it unwrapped.
    fn build_sandbox_args(&self, program: &str, args: &[String]) -> Option<WrappedCommand>;

    /// Probe whether the mechanism works on this machine.
    async fn validate(&self) -> bool;
}

/// Select the sandbox implementation for the current platform.
///
/// A disabled config always yields the passthrough; an enabled config on an
/// unsupported platform yields a passthrough that warns once.
pub fn create_sandbox(config: FinalizedSandboxConfig) -> Box<dyn Sandbox> {
    if !config.enabled {
        return Box::new(PassthroughSandbox::disabled());
    }
    if cfg!(target_os = "linux") {
        Box::new(BubblewrapSandbox::new(config))
    } else if cfg!(target_os = "macos") {
        Box::new(SeatbeltSandbox::new(config))
    } else {
        Box::new(PassthroughSandbox::unsupported_platform())
    }
}
