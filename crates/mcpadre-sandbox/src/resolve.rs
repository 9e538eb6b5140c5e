//! Sandbox config finalization
//!
//! Expands the raw per-server sandbox config into absolute, existing,
//! deduplicated allow-lists. The procedure only ever narrows to paths that
//! exist at resolve time; a missing path is logged and dropped, never
//! fatal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mcpadre_config::{
    DirectoryResolver, GlobalOptions, PathTemplate, SandboxConfig, resolve_template,
};
use mcpadre_fs::NormalizedPath;

use crate::error::Result;

/// Filesystem questions asked during finalization.
///
/// Kept behind a trait so the resolution procedure can be exercised against
/// a fake filesystem.
pub trait PathProbe {
    fn exists(&self, path: &Path) -> bool;
    fn canonicalize(&self, path: &Path) -> PathBuf;
}

/// The real filesystem.
pub struct OsPathProbe;

impl PathProbe for OsPathProbe {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }
}

/// Workspace inputs to sandbox finalization.
pub struct SandboxWorkspace<'a> {
    pub dirs: &'a DirectoryResolver,
    pub parent_env: &'a HashMap<String, String>,
    pub options: &'a GlobalOptions,
    /// The per-server directory, for variants that materialize state. It is
    /// granted read-write even when the workspace root is omitted.
    pub server_dir: Option<NormalizedPath>,
}

/// A sandbox config with every path absolute, canonical, and existing.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedSandboxConfig {
    pub enabled: bool,
    pub networking: bool,
    pub allow_read: Vec<PathBuf>,
    pub allow_read_write: Vec<PathBuf>,
}

/// Default read-only system paths, filtered by existence below.
const SYSTEM_READ_PATHS: [&str; 8] = [
    "/bin",
    "/usr/bin",
    "/lib",
    "/lib64",
    "/usr/lib",
    "/usr/lib64",
    "/usr/share",
    "/System/Library",
];

/// DNS resolution paths granted when networking is on.
const DNS_PATHS: [&str; 3] = ["/etc/resolv.conf", "/etc/hosts", "/etc/nsswitch.conf"];

/// Finalize a raw sandbox config against one workspace.
pub fn resolve_sandbox_config(
    config: &SandboxConfig,
    workspace: &SandboxWorkspace<'_>,
    probe: &dyn PathProbe,
) -> Result<FinalizedSandboxConfig> {
    let enabled = if workspace.options.disable_all_sandboxes {
        false
    } else {
        config.enabled
    };

    let mut read_templates: Vec<PathTemplate> = Vec::new();
    read_templates.extend(config.allow_read.iter().cloned());
    read_templates.extend(workspace.options.extra_allow_read.iter().cloned());

    let mut write_templates: Vec<PathTemplate> = Vec::new();
    write_templates.extend(config.allow_read_write.iter().cloned());
    write_templates.extend(workspace.options.extra_allow_write.iter().cloned());

    if !config.omit_workspace_path {
        read_templates.push(PathTemplate::from("{{dirs.workspace}}"));
    }
    read_templates.extend(SYSTEM_READ_PATHS.iter().map(|p| PathTemplate::from(*p)));
    if let Some(shell) = user_shell(workspace.parent_env) {
        read_templates.push(PathTemplate::from(shell.as_str()));
    }

    // Servers keep their materialized state regardless of
    // omit_workspace_path.
    if let Some(server_dir) = &workspace.server_dir {
        write_templates.push(PathTemplate::from(server_dir.as_str()));
    }
    for temp_binding in ["{{parentEnv.TMPDIR}}", "{{parentEnv.TEMP}}", "{{parentEnv.TMP}}", "/tmp"]
    {
        write_templates.push(PathTemplate::from(temp_binding));
    }

    if config.networking {
        read_templates.extend(DNS_PATHS.iter().map(|p| PathTemplate::from(*p)));
    }

    let allow_read_write = finalize_paths(&write_templates, workspace, probe)?;
    let mut allow_read = finalize_paths(&read_templates, workspace, probe)?;
    // A read-write grant subsumes a read grant on the same path.
    allow_read.retain(|p| !allow_read_write.contains(p));

    Ok(FinalizedSandboxConfig {
        enabled,
        networking: config.networking,
        allow_read,
        allow_read_write,
    })
}

/// Expand, absolutize, existence-filter, canonicalize, dedupe.
fn finalize_paths(
    templates: &[PathTemplate],
    workspace: &SandboxWorkspace<'_>,
    probe: &dyn PathProbe,
) -> Result<Vec<PathBuf>> {
    let mut finalized: Vec<PathBuf> = Vec::new();
    for template in templates {
        let expanded = resolve_template(template.as_str(), workspace.dirs, workspace.parent_env)?;
        if expanded.is_empty() {
            continue;
        }

        let absolute = if Path::new(&expanded).is_absolute() {
            PathBuf::from(&expanded)
        } else {
            workspace
                .dirs
                .layout()
                .workspace_root()
                .join(&expanded)
                .to_native()
        };

        if !probe.exists(&absolute) {
            tracing::warn!(path = %absolute.display(), "sandbox path does not exist, dropping");
            continue;
        }

        let canonical = probe.canonicalize(&absolute);
        if !finalized.contains(&canonical) {
            finalized.push(canonical);
        }
    }
    Ok(finalized)
}

/// The user's shell binary: `$SHELL`, `%COMSPEC%` on Windows, `/bin/sh`
/// otherwise.
fn user_shell(parent_env: &HashMap<String, String>) -> Option<String> {
    if let Some(shell) = parent_env.get("SHELL").filter(|s| !s.is_empty()) {
        return Some(shell.clone());
    }
    if cfg!(windows) {
        if let Some(comspec) = parent_env.get("COMSPEC").filter(|s| !s.is_empty()) {
            return Some(comspec.clone());
        }
    }
    Some("/bin/sh".to_string())
}
