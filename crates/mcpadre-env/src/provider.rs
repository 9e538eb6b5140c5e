//! EnvironmentProvider trait and related types

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use mcpadre_config::{GlobalOptions, RuntimeSpec, ServerSpec};
use mcpadre_fs::NormalizedPath;

use crate::Result;
use crate::container::ContainerProvider;
use crate::node::NodeEnvProvider;
use crate::python::PythonEnvProvider;
use crate::shell::ShellProvider;

/// What `materialize` should do for one server directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftAction {
    /// No state on disk yet; a full install is required.
    Create,
    /// Config and state agree; refresh derived artifacts only.
    Sync,
    /// Config changed and policy permits rewriting the state.
    Upgrade,
    /// Config changed but policy forbids the upgrade.
    Skip,
}

/// Result of comparing the configured spec against the server directory.
#[derive(Debug, Clone)]
pub struct DriftReport {
    pub action: DriftAction,
    /// Human-readable one-per-axis change lines, stable across releases.
    pub changes: Vec<String>,
}

impl DriftReport {
    pub fn create() -> Self {
        Self {
            action: DriftAction::Create,
            changes: Vec::new(),
        }
    }

    pub fn sync() -> Self {
        Self {
            action: DriftAction::Sync,
            changes: Vec::new(),
        }
    }

    pub fn changed(changes: Vec<String>, permitted: bool) -> Self {
        Self {
            action: if permitted {
                DriftAction::Upgrade
            } else {
                DriftAction::Skip
            },
            changes,
        }
    }
}

/// Whether a detected change may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpgradePolicy {
    /// Per-server override > global `installImplicitlyUpgradesChangedPackages`.
    pub allow_implicit: bool,
    /// `--force` upgrades regardless, downgrades included.
    pub force: bool,
}

impl UpgradePolicy {
    pub fn permits_upgrade(&self) -> bool {
        self.force || self.allow_implicit
    }

    /// Like [`permits_upgrade`](Self::permits_upgrade), but implicit
    /// permission never covers a downgrade.
    pub fn permits(&self, downgrade: bool) -> bool {
        self.force || (self.allow_implicit && !downgrade)
    }
}

/// Whether moving from `installed` to `desired` lowers the version.
/// Unparseable versions are never treated as downgrades.
pub fn is_version_downgrade(installed: &str, desired: &str) -> bool {
    match (
        semver::Version::parse(installed),
        semver::Version::parse(desired),
    ) {
        (Ok(installed), Ok(desired)) => desired < installed,
        _ => false,
    }
}

/// How `run` should exec the server once the environment is current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
}

/// Inputs shared by every provider operation.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    pub server_name: String,
    /// The workspace root; always exists.
    pub workspace_root: NormalizedPath,
    /// The per-server state directory; may not exist for shell servers.
    pub server_dir: NormalizedPath,
    /// Parent process environment snapshot.
    pub parent_env: HashMap<String, String>,
    /// The per-server env map, templates already resolved.
    pub resolved_env: BTreeMap<String, String>,
    pub options: GlobalOptions,
}

impl ProviderContext {
    /// The merged environment the child runs with: the parent environment
    /// overlaid by the per-server values.
    pub fn child_env(&self) -> BTreeMap<String, String> {
        let mut env: BTreeMap<String, String> =
            self.parent_env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        env.extend(self.resolved_env.clone());
        env
    }
}

/// Core contract shared by all server environment managers.
#[async_trait]
pub trait EnvironmentProvider: Send + Sync {
    /// Short variant name for log lines.
    fn kind(&self) -> &'static str;

    /// Verify the base runtime exists and helpers are installable.
    async fn ensure_prerequisites(&self, ctx: &ProviderContext) -> Result<()>;

    /// Compare the configured spec against the server directory.
    async fn detect_drift(&self, ctx: &ProviderContext, policy: UpgradePolicy)
    -> Result<DriftReport>;

    /// Execute the action chosen by [`detect_drift`](Self::detect_drift).
    async fn materialize(&self, ctx: &ProviderContext, report: &DriftReport) -> Result<()>;

    /// Describe how `run` should exec the server.
    async fn build_launch(&self, ctx: &ProviderContext) -> Result<LaunchSpec>;
}

/// Select the manager for a runtime variant.
///
/// `Http` servers have no process-backed environment; the runner bridges
/// them directly, so they have no provider here.
pub fn provider_for(runtime: &RuntimeSpec) -> Option<Box<dyn EnvironmentProvider>> {
    match runtime {
        RuntimeSpec::Node(spec) => Some(Box::new(NodeEnvProvider::new(spec.clone()))),
        RuntimeSpec::Python(spec) => Some(Box::new(PythonEnvProvider::new(spec.clone()))),
        RuntimeSpec::Container(spec) => Some(Box::new(ContainerProvider::new(spec.clone()))),
        RuntimeSpec::Shell(spec) => Some(Box::new(ShellProvider::new(spec.clone()))),
        RuntimeSpec::Http(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_policy_table() {
        // | detected change | allow implicit | --force | action |
        let cases = [
            (false, false, DriftAction::Skip),
            (true, false, DriftAction::Upgrade),
            (false, true, DriftAction::Upgrade),
            (true, true, DriftAction::Upgrade),
        ];
        for (allow_implicit, force, expected) in cases {
            let policy = UpgradePolicy {
                allow_implicit,
                force,
            };
            let report = DriftReport::changed(
                vec!["Package version: a==1 → a==2".to_string()],
                policy.permits_upgrade(),
            );
            assert_eq!(report.action, expected, "implicit={allow_implicit} force={force}");
        }
    }

    #[test]
    fn test_implicit_permission_never_covers_downgrades() {
        let implicit = UpgradePolicy {
            allow_implicit: true,
            force: false,
        };
        assert!(implicit.permits(false));
        assert!(!implicit.permits(true));

        let forced = UpgradePolicy {
            allow_implicit: false,
            force: true,
        };
        assert!(forced.permits(true));
    }

    #[test]
    fn test_is_version_downgrade() {
        assert!(is_version_downgrade("0.7.0", "0.6.0"));
        assert!(!is_version_downgrade("0.6.0", "0.7.0"));
        assert!(!is_version_downgrade("0.6.0", "0.6.0"));
        // Unparseable pins never count as downgrades.
        assert!(!is_version_downgrade("latest", "0.6.0"));
        assert!(!is_version_downgrade("0.6.0", "latest"));
    }

    #[test]
    fn test_no_change_is_sync() {
        assert_eq!(DriftReport::sync().action, DriftAction::Sync);
        assert!(DriftReport::sync().changes.is_empty());
    }

    #[test]
    fn test_new_install_is_create() {
        assert_eq!(DriftReport::create().action, DriftAction::Create);
    }

    #[test]
    fn test_child_env_overlays_server_env() {
        let mut parent = HashMap::new();
        parent.insert("PATH".to_string(), "/usr/bin".to_string());
        parent.insert("SHARED".to_string(), "parent".to_string());
        let mut resolved = BTreeMap::new();
        resolved.insert("SHARED".to_string(), "server".to_string());
        resolved.insert("EXTRA".to_string(), "1".to_string());

        let ctx = ProviderContext {
            server_name: "s".to_string(),
            workspace_root: NormalizedPath::new("/w"),
            server_dir: NormalizedPath::new("/w/.mcpadre/servers/s"),
            parent_env: parent,
            resolved_env: resolved,
            options: GlobalOptions::default(),
        };
        let env = ctx.child_env();
        assert_eq!(env["PATH"], "/usr/bin");
        assert_eq!(env["SHARED"], "server");
        assert_eq!(env["EXTRA"], "1");
    }

    #[test]
    fn test_provider_dispatch_by_variant() {
        let node: ServerSpec = serde_yaml::from_str(
            "node:\n  package: \"@scope/pkg\"\n  version: \"1.0.0\"\n",
        )
        .unwrap();
        assert_eq!(provider_for(&node.runtime).unwrap().kind(), "node");

        let http: ServerSpec =
            serde_yaml::from_str("http:\n  url: \"https://example.com\"\n").unwrap();
        assert!(provider_for(&http.runtime).is_none());
    }
}
