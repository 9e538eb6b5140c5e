//! Bounded external probes
//!
//! Prerequisite checks shell out to `--version`-style commands. They are
//! fail-fast: a probe that does not answer within the timeout counts as a
//! missing tool rather than blocking startup or shutdown.

use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

/// Default bound for `--version`-style probes.
pub(crate) const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Run a probe command, bounded by [`PROBE_TIMEOUT`].
pub(crate) async fn probe_output(command: &mut Command) -> std::io::Result<Output> {
    match tokio::time::timeout(PROBE_TIMEOUT, command.output()).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "probe timed out",
        )),
    }
}
