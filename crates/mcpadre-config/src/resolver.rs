//! Scope merging
//!
//! The effective configuration is the user scope overlaid by the project
//! scope: servers merge by union with project winning per name, options
//! merge field-wise with project winning per field.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::schema::SettingsFile;
use crate::schema::options::GlobalOptions;
use crate::schema::server::ServerSpec;

/// The merged, effective configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub servers: BTreeMap<String, ServerSpec>,
    pub hosts: BTreeMap<String, bool>,
    pub options: GlobalOptions,
}

impl Settings {
    /// Merge the user scope (if any) under the project scope.
    pub fn merge(user: Option<SettingsFile>, project: SettingsFile) -> Self {
        let user = user.unwrap_or_default();

        let mut servers = user.mcp_servers;
        servers.extend(project.mcp_servers);

        let mut hosts = user.hosts;
        hosts.extend(project.hosts);

        let options = user.options.overlay(&project.options).into();

        Self {
            servers,
            hosts,
            options,
        }
    }

    /// A single-scope settings value (user-only workspaces).
    pub fn from_single(file: SettingsFile) -> Self {
        Self {
            servers: file.mcp_servers,
            hosts: file.hosts,
            options: file.options.into(),
        }
    }

    /// Look up a server by name.
    pub fn server(&self, name: &str) -> Result<&ServerSpec> {
        self.servers.get(name).ok_or_else(|| Error::ServerUnknown {
            name: name.to_string(),
        })
    }

    /// Effective implicit-upgrade policy for one server: the per-server
    /// override wins over the global option.
    pub fn allows_implicit_upgrade(&self, spec: &ServerSpec) -> bool {
        spec.install_implicitly_upgrades_changed_packages
            .unwrap_or(self.options.install_implicitly_upgrades_changed_packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::options::GlobalOptionsFile;
    use crate::schema::server::RuntimeSpec;

    fn settings_file(yaml: &str) -> SettingsFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_project_server_shadows_user_server() {
        let user = settings_file(
            r#"
mcpServers:
  memory:
    node:
      package: "@modelcontextprotocol/server-memory"
      version: "0.5.0"
  user-only:
    shell:
      command: "cat"
"#,
        );
        let project = settings_file(
            r#"
mcpServers:
  memory:
    node:
      package: "@modelcontextprotocol/server-memory"
      version: "0.6.0"
"#,
        );

        let merged = Settings::merge(Some(user), project);
        assert_eq!(merged.servers.len(), 2);
        match &merged.servers["memory"].runtime {
            RuntimeSpec::Node(node) => assert_eq!(node.version, "0.6.0"),
            other => panic!("expected node, got {other:?}"),
        }
        assert!(merged.servers.contains_key("user-only"));
    }

    #[test]
    fn test_options_merge_field_wise() {
        let user = SettingsFile {
            options: GlobalOptionsFile {
                log_mcp_traffic: Some(true),
                install_implicitly_upgrades_changed_packages: Some(true),
                ..Default::default()
            },
            ..Default::default()
        };
        let project = SettingsFile {
            options: GlobalOptionsFile {
                install_implicitly_upgrades_changed_packages: Some(false),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = Settings::merge(Some(user), project);
        assert!(merged.options.log_mcp_traffic);
        assert!(!merged.options.install_implicitly_upgrades_changed_packages);
    }

    #[test]
    fn test_server_unknown() {
        let merged = Settings::merge(None, SettingsFile::default());
        assert!(matches!(
            merged.server("nope"),
            Err(Error::ServerUnknown { .. })
        ));
    }

    #[test]
    fn test_per_server_upgrade_override_beats_global() {
        let project = settings_file(
            r#"
mcpServers:
  pinned:
    python:
      package: mcp-pypi
      version: "2.6.5"
    installImplicitlyUpgradesChangedPackages: true
options:
  installImplicitlyUpgradesChangedPackages: false
"#,
        );
        let merged = Settings::merge(None, project);
        let spec = merged.server("pinned").unwrap();
        assert!(merged.allows_implicit_upgrade(spec));
    }
}
