//! Workspace context
//!
//! A [`WorkspaceContext`] is created once per CLI invocation from flags and
//! the OS environment, and is immutable afterwards. Project workspaces are
//! discovered by walking up from the current directory; the user workspace
//! lives at `$MCPADRE_USER_DIR` (or `$HOME/.mcpadre`) and also overlays
//! project workspaces as the fallback scope.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mcpadre_fs::NormalizedPath;

use crate::dirs::DirectoryResolver;
use crate::error::Result;
use crate::loader::{discover_workspace, find_config_file, load_settings_file};
use crate::resolver::Settings;

/// Which scope a workspace context operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceKind {
    Project,
    User,
}

/// The root of everything one command execution sees.
#[derive(Debug)]
pub struct WorkspaceContext {
    kind: WorkspaceKind,
    root: NormalizedPath,
    settings: Settings,
    config_path: PathBuf,
    dirs: DirectoryResolver,
    parent_env: HashMap<String, String>,
}

impl WorkspaceContext {
    /// Open the project workspace containing `cwd`, overlaying the user
    /// scope when a user config exists.
    pub fn open_project(cwd: &Path, env: HashMap<String, String>) -> Result<Self> {
        let (root, config_path) = discover_workspace(cwd)?;
        let project = load_settings_file(&config_path)?;

        let dirs = DirectoryResolver::new(root.clone(), env.clone());
        // An undeterminable user scope just means no user overlay.
        let user = match dirs.user_dir() {
            Ok(user_dir) => match find_config_file(&user_dir)? {
                Some(user_config) => Some(load_settings_file(&user_config)?),
                None => None,
            },
            Err(_) => None,
        };

        Ok(Self {
            kind: WorkspaceKind::Project,
            root: NormalizedPath::new(&root),
            settings: Settings::merge(user, project),
            config_path,
            dirs,
            parent_env: env,
        })
    }

    /// Open the user workspace directly (`--user`).
    pub fn open_user(env: HashMap<String, String>, dir_override: Option<&Path>) -> Result<Self> {
        let probe = DirectoryResolver::new(".", env.clone());
        let root = match dir_override {
            Some(dir) => dir.to_path_buf(),
            None => probe.user_dir()?,
        };

        let config_path = find_config_file(&root)?.ok_or(crate::error::Error::ConfigMissing {
            start: root.clone(),
        })?;
        let file = load_settings_file(&config_path)?;

        Ok(Self {
            kind: WorkspaceKind::User,
            root: NormalizedPath::new(&root),
            settings: Settings::from_single(file),
            config_path,
            dirs: DirectoryResolver::new(root, env.clone()),
            parent_env: env,
        })
    }

    pub fn kind(&self) -> WorkspaceKind {
        self.kind
    }

    /// Workspace root directory.
    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// The merged, effective settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The writable config file for this scope.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Directory resolver rooted at this workspace.
    pub fn dirs(&self) -> &DirectoryResolver {
        &self.dirs
    }

    /// The parent environment snapshot taken at startup.
    pub fn parent_env(&self) -> &HashMap<String, String> {
        &self.parent_env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn env_with_user_dir(dir: &Path) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("HOME".to_string(), "/nonexistent".to_string());
        env.insert(
            "MCPADRE_USER_DIR".to_string(),
            dir.to_string_lossy().into_owned(),
        );
        env
    }

    #[test]
    fn test_open_project_without_user_scope() {
        let temp = TempDir::new().unwrap();
        let user_dir = TempDir::new().unwrap();
        fs::write(
            temp.path().join("mcpadre.yaml"),
            "mcpServers:\n  echo:\n    shell:\n      command: cat\n",
        )
        .unwrap();

        let ctx =
            WorkspaceContext::open_project(temp.path(), env_with_user_dir(user_dir.path()))
                .unwrap();
        assert_eq!(ctx.kind(), WorkspaceKind::Project);
        assert!(ctx.settings().servers.contains_key("echo"));
        assert!(ctx.config_path().ends_with("mcpadre.yaml"));
    }

    #[test]
    fn test_open_project_overlays_user_scope() {
        let temp = TempDir::new().unwrap();
        let user_dir = TempDir::new().unwrap();
        fs::write(
            temp.path().join("mcpadre.yaml"),
            "mcpServers:\n  project-srv:\n    shell:\n      command: cat\n",
        )
        .unwrap();
        fs::write(
            user_dir.path().join("mcpadre.yaml"),
            "mcpServers:\n  user-srv:\n    shell:\n      command: cat\n",
        )
        .unwrap();

        let ctx =
            WorkspaceContext::open_project(temp.path(), env_with_user_dir(user_dir.path()))
                .unwrap();
        assert!(ctx.settings().servers.contains_key("project-srv"));
        assert!(ctx.settings().servers.contains_key("user-srv"));
    }

    #[test]
    fn test_open_user_requires_config() {
        let user_dir = TempDir::new().unwrap();
        let result = WorkspaceContext::open_user(env_with_user_dir(user_dir.path()), None);
        assert!(result.is_err());

        fs::write(
            user_dir.path().join("mcpadre.yaml"),
            "mcpServers:\n  u:\n    shell:\n      command: cat\n",
        )
        .unwrap();
        let ctx = WorkspaceContext::open_user(env_with_user_dir(user_dir.path()), None).unwrap();
        assert_eq!(ctx.kind(), WorkspaceKind::User);
        assert!(ctx.settings().servers.contains_key("u"));
    }

    #[test]
    fn test_open_user_with_dir_override() {
        let override_dir = TempDir::new().unwrap();
        fs::write(
            override_dir.path().join("mcpadre.json"),
            r#"{"mcpServers":{"j":{"shell":{"command":"cat"}}}}"#,
        )
        .unwrap();

        let ctx = WorkspaceContext::open_user(HashMap::new(), Some(override_dir.path())).unwrap();
        assert!(ctx.settings().servers.contains_key("j"));
    }
}
