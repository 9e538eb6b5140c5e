//! Raw per-server sandbox configuration

use serde::{Deserialize, Serialize};

use super::template::PathTemplate;

/// Sandbox settings as written in the config file.
///
/// Paths are still templates here; the sandbox resolver turns this into a
/// finalized config with absolute, existing, deduplicated paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SandboxConfig {
    /// Whether the server runs under an OS sandbox at all.
    pub enabled: bool,

    /// Whether the sandboxed process may reach the network.
    pub networking: bool,

    /// Skip the automatic read grant for the workspace root.
    pub omit_workspace_path: bool,

    /// Extra read-only paths.
    pub allow_read: Vec<PathTemplate>,

    /// Extra read-write paths.
    pub allow_read_write: Vec<PathTemplate>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            networking: true,
            omit_workspace_path: false,
            allow_read: Vec::new(),
            allow_read_write: Vec::new(),
        }
    }
}
