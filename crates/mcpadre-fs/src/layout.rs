//! The managed `.mcpadre/` workspace layout
//!
//! Every workspace owns a `.mcpadre/` directory holding one subdirectory
//! per configured server plus an optional `logs/` directory for traffic
//! logs. Server directories are addressed by the server name verbatim, so
//! names are validated before they ever touch the filesystem.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::path::NormalizedPath;

/// Directory name of the managed state root inside a workspace.
pub const MCPADRE_DIR: &str = ".mcpadre";

/// Subdirectory of [`MCPADRE_DIR`] holding per-server directories.
pub const SERVERS_DIR: &str = "servers";

/// Subdirectory of [`MCPADRE_DIR`] holding traffic logs.
pub const LOGS_DIR: &str = "logs";

/// File name of the per-server advisory lock.
pub const SERVER_LOCK_FILE: &str = ".mcpadre.lock";

fn server_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("valid pattern")
    })
}

/// Validate a server name for use as a directory component.
///
/// Names must start and end with an alphanumeric character and may contain
/// dots, underscores, and dashes in between. Single-character names are
/// allowed.
pub fn validate_server_name(name: &str) -> Result<()> {
    if server_name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidServerName {
            name: name.to_string(),
        })
    }
}

/// Resolved paths inside a workspace's `.mcpadre/` directory.
#[derive(Debug, Clone)]
pub struct WorkspaceLayout {
    root: NormalizedPath,
}

impl WorkspaceLayout {
    /// Create a layout rooted at the given workspace directory.
    pub fn new(workspace_root: impl Into<NormalizedPath>) -> Self {
        Self {
            root: workspace_root.into(),
        }
    }

    /// The workspace root directory.
    pub fn workspace_root(&self) -> &NormalizedPath {
        &self.root
    }

    /// `<workspace>/.mcpadre`
    pub fn state_dir(&self) -> NormalizedPath {
        self.root.join(MCPADRE_DIR)
    }

    /// `<workspace>/.mcpadre/servers`
    pub fn servers_dir(&self) -> NormalizedPath {
        self.state_dir().join(SERVERS_DIR)
    }

    /// `<workspace>/.mcpadre/logs`
    pub fn logs_dir(&self) -> NormalizedPath {
        self.state_dir().join(LOGS_DIR)
    }

    /// `<workspace>/.mcpadre/servers/<name>`, validating the name first.
    pub fn server_dir(&self, name: &str) -> Result<NormalizedPath> {
        validate_server_name(name)?;
        Ok(self.servers_dir().join(name))
    }

    /// `<workspace>/.mcpadre/servers/<name>/.mcpadre.lock`
    pub fn server_lock_path(&self, name: &str) -> Result<NormalizedPath> {
        Ok(self.server_dir(name)?.join(SERVER_LOCK_FILE))
    }

    /// Create the server directory (and parents) if missing.
    pub fn ensure_server_dir(&self, name: &str) -> Result<NormalizedPath> {
        let dir = self.server_dir(name)?;
        std::fs::create_dir_all(dir.to_native()).map_err(|e| Error::io(dir.to_native(), e))?;
        Ok(dir)
    }

    /// Create the logs directory if missing.
    pub fn ensure_logs_dir(&self) -> Result<NormalizedPath> {
        let dir = self.logs_dir();
        std::fs::create_dir_all(dir.to_native()).map_err(|e| Error::io(dir.to_native(), e))?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_server_name_accepts_typical_names() {
        for name in ["memory", "mcp-pypi", "server.v2", "a", "A9", "x_y-z.1"] {
            assert!(validate_server_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_validate_server_name_rejects_bad_names() {
        for name in ["", "-leading", "trailing-", ".dot", "dot.", "sp ace", "sla/sh", "../up"] {
            assert!(validate_server_name(name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn test_layout_paths() {
        let layout = WorkspaceLayout::new("/workspace");
        assert_eq!(layout.state_dir().as_str(), "/workspace/.mcpadre");
        assert_eq!(layout.servers_dir().as_str(), "/workspace/.mcpadre/servers");
        assert_eq!(layout.logs_dir().as_str(), "/workspace/.mcpadre/logs");
        assert_eq!(
            layout.server_dir("memory").unwrap().as_str(),
            "/workspace/.mcpadre/servers/memory"
        );
        assert_eq!(
            layout.server_lock_path("memory").unwrap().as_str(),
            "/workspace/.mcpadre/servers/memory/.mcpadre.lock"
        );
    }

    #[test]
    fn test_server_dir_rejects_invalid_name() {
        let layout = WorkspaceLayout::new("/workspace");
        assert!(layout.server_dir("../escape").is_err());
    }

    #[test]
    fn test_ensure_server_dir_creates_directories() {
        let temp = TempDir::new().unwrap();
        let layout = WorkspaceLayout::new(temp.path());

        let dir = layout.ensure_server_dir("memory").unwrap();
        assert!(dir.is_dir());
        // Idempotent
        let again = layout.ensure_server_dir("memory").unwrap();
        assert_eq!(dir, again);
    }
}
