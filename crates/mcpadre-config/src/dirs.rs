//! Workspace and platform directory resolution
//!
//! Computes the canonical directories templates can reference through
//! `{{dirs.*}}`, plus the per-server directory under the workspace.

use std::collections::HashMap;
use std::path::PathBuf;

use mcpadre_fs::{NormalizedPath, WorkspaceLayout};

use crate::error::{Error, Result};

/// The directory keys addressable from templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirKey {
    Workspace,
    Home,
    Data,
    Cache,
    Log,
    Config,
    Temp,
    User,
}

impl DirKey {
    /// Parse the `x` of a `{{dirs.x}}` binding.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "workspace" => Some(Self::Workspace),
            "home" => Some(Self::Home),
            "data" => Some(Self::Data),
            "cache" => Some(Self::Cache),
            "log" => Some(Self::Log),
            "config" => Some(Self::Config),
            "temp" => Some(Self::Temp),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Home => "home",
            Self::Data => "data",
            Self::Cache => "cache",
            Self::Log => "log",
            Self::Config => "config",
            Self::Temp => "temp",
            Self::User => "user",
        }
    }
}

/// Resolves `{{dirs.*}}` keys to absolute paths for one workspace.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    layout: WorkspaceLayout,
    /// Environment snapshot used for HOME / MCPADRE_USER_DIR lookups, so
    /// resolution is deterministic and testable.
    env: HashMap<String, String>,
}

impl DirectoryResolver {
    /// Build a resolver from the workspace root and the parent environment.
    pub fn new(workspace_root: impl Into<NormalizedPath>, env: HashMap<String, String>) -> Self {
        Self {
            layout: WorkspaceLayout::new(workspace_root),
            env,
        }
    }

    /// Build a resolver snapshotting the current process environment.
    pub fn from_os_env(workspace_root: impl Into<NormalizedPath>) -> Self {
        Self::new(workspace_root, std::env::vars().collect())
    }

    /// The workspace layout this resolver is rooted at.
    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Resolve one directory key to an absolute path.
    pub fn resolve(&self, key: DirKey) -> Result<NormalizedPath> {
        let path = match key {
            DirKey::Workspace => return Ok(self.layout.workspace_root().clone()),
            DirKey::Home => self
                .home_dir()
                .ok_or(Error::DirUnavailable { dir: "home" })?,
            DirKey::Data => self
                .base_dir(dirs::data_dir())
                .ok_or(Error::DirUnavailable { dir: "data" })?,
            DirKey::Cache => self
                .base_dir(dirs::cache_dir())
                .ok_or(Error::DirUnavailable { dir: "cache" })?,
            DirKey::Log => self
                .base_dir(dirs::data_dir())
                .map(|d| d.join("logs"))
                .ok_or(Error::DirUnavailable { dir: "log" })?,
            DirKey::Config => self
                .base_dir(dirs::config_dir())
                .ok_or(Error::DirUnavailable { dir: "config" })?,
            DirKey::Temp => std::env::temp_dir(),
            DirKey::User => return Ok(NormalizedPath::new(self.user_dir()?)),
        };
        Ok(NormalizedPath::new(path))
    }

    /// Per-server directory `<workspace>/.mcpadre/servers/<name>`.
    pub fn server_dir(&self, name: &str) -> Result<NormalizedPath> {
        Ok(self.layout.server_dir(name)?)
    }

    /// The user-scope root: `$MCPADRE_USER_DIR`, else `$HOME/.mcpadre`.
    pub fn user_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = self.env.get("MCPADRE_USER_DIR") {
            if !dir.is_empty() {
                return Ok(PathBuf::from(dir));
            }
        }
        self.home_dir()
            .map(|home| home.join(".mcpadre"))
            .ok_or(Error::DirUnavailable { dir: "user" })
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.env
            .get("HOME")
            .filter(|h| !h.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
    }

    fn base_dir(&self, platform: Option<PathBuf>) -> Option<PathBuf> {
        platform.map(|d| d.join("mcpadre"))
    }
}
