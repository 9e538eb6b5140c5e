//! Workspace-wide options

use serde::{Deserialize, Serialize};

use super::template::PathTemplate;

/// Which version manager drives a language runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionManagerConfig {
    /// Detect asdf/mise from the resolved runtime path.
    #[default]
    Auto,
    Asdf,
    Mise,
    /// No version manager; never reshim.
    None,
}

/// Options as they appear in one config file. Every field optional so the
/// project/user merge can distinguish unset from default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalOptionsFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_version_manager: Option<VersionManagerConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python_version_manager: Option<VersionManagerConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_implicitly_upgrades_changed_packages: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_all_sandboxes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_allow_read: Option<Vec<PathTemplate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_allow_write: Option<Vec<PathTemplate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_mcp_traffic: Option<bool>,
}

impl GlobalOptionsFile {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay `other` on top of self, field-wise. Set fields in `other`
    /// win.
    pub fn overlay(&self, other: &Self) -> Self {
        Self {
            node_version_manager: other.node_version_manager.or(self.node_version_manager),
            python_version_manager: other
                .python_version_manager
                .or(self.python_version_manager),
            install_implicitly_upgrades_changed_packages: other
                .install_implicitly_upgrades_changed_packages
                .or(self.install_implicitly_upgrades_changed_packages),
            disable_all_sandboxes: other.disable_all_sandboxes.or(self.disable_all_sandboxes),
            extra_allow_read: other
                .extra_allow_read
                .clone()
                .or_else(|| self.extra_allow_read.clone()),
            extra_allow_write: other
                .extra_allow_write
                .clone()
                .or_else(|| self.extra_allow_write.clone()),
            log_mcp_traffic: other.log_mcp_traffic.or(self.log_mcp_traffic),
        }
    }
}

/// Effective options after merging all scopes and applying defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalOptions {
    pub node_version_manager: VersionManagerConfig,
    pub python_version_manager: VersionManagerConfig,
    pub install_implicitly_upgrades_changed_packages: bool,
    pub disable_all_sandboxes: bool,
    pub extra_allow_read: Vec<PathTemplate>,
    pub extra_allow_write: Vec<PathTemplate>,
    pub log_mcp_traffic: bool,
}

impl From<GlobalOptionsFile> for GlobalOptions {
    fn from(file: GlobalOptionsFile) -> Self {
        Self {
            node_version_manager: file.node_version_manager.unwrap_or_default(),
            python_version_manager: file.python_version_manager.unwrap_or_default(),
            install_implicitly_upgrades_changed_packages: file
                .install_implicitly_upgrades_changed_packages
                .unwrap_or(false),
            disable_all_sandboxes: file.disable_all_sandboxes.unwrap_or(false),
            extra_allow_read: file.extra_allow_read.unwrap_or_default(),
            extra_allow_write: file.extra_allow_write.unwrap_or_default(),
            log_mcp_traffic: file.log_mcp_traffic.unwrap_or(false),
        }
    }
}

impl Default for GlobalOptions {
    fn default() -> Self {
        GlobalOptionsFile::default().into()
    }
}
