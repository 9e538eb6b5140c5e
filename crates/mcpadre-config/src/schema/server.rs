//! Server specifications
//!
//! A server entry names exactly one runtime variant (`node:`, `python:`,
//! `container:`, `shell:`, or `http:`) plus optional per-server env,
//! sandbox, and upgrade-policy overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::sandbox::SandboxConfig;
use super::template::{CommandTemplate, EnvTemplate};

/// A configured MCP server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerSpec {
    /// The runtime variant, keyed by its config-file tag.
    #[serde(flatten)]
    pub runtime: RuntimeSpec,

    /// Per-server environment, values may contain templates.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, EnvTemplate>,

    /// Per-server sandbox override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxConfig>,

    /// Per-server override of the global implicit-upgrade flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_implicitly_upgrades_changed_packages: Option<bool>,
}

/// The five runtime variants, externally tagged by the config key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeSpec {
    Node(NodeSpec),
    Python(PythonSpec),
    Container(ContainerSpec),
    Shell(ShellSpec),
    Http(HttpSpec),
}

impl RuntimeSpec {
    /// Short variant name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Node(_) => "node",
            Self::Python(_) => "python",
            Self::Container(_) => "container",
            Self::Shell(_) => "shell",
            Self::Http(_) => "http",
        }
    }

    /// Whether this variant materializes state on disk.
    pub fn has_server_directory(&self) -> bool {
        matches!(self, Self::Node(_) | Self::Python(_) | Self::Container(_))
    }
}

/// An npm package pinned to an exact version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub package: String,
    pub version: String,
}

/// A PyPI package pinned to an exact version, with an optional interpreter
/// pin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PythonSpec {
    pub package: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_version: Option<String>,
}

/// A container image addressed by tag; pinned by digest at install time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSpec {
    pub image: String,
    pub tag: String,
}

/// A raw command run as-is after template resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShellSpec {
    pub command: CommandTemplate,
}

/// A remote MCP server reached over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpSpec {
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, EnvTemplate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_spec_from_yaml() {
        let yaml = r#"
python:
  package: mcp-pypi
  version: "2.6.5"
  pythonVersion: "3.11.11"
env:
  API_KEY: "{{parentEnv.API_KEY}}"
"#;
        let spec: ServerSpec = serde_yaml::from_str(yaml).unwrap();
        match &spec.runtime {
            RuntimeSpec::Python(python) => {
                assert_eq!(python.package, "mcp-pypi");
                assert_eq!(python.version, "2.6.5");
                assert_eq!(python.python_version.as_deref(), Some("3.11.11"));
            }
            other => panic!("expected python, got {other:?}"),
        }
        assert_eq!(spec.env["API_KEY"].as_str(), "{{parentEnv.API_KEY}}");
        assert!(spec.sandbox.is_none());
    }

    #[test]
    fn test_container_spec_from_yaml() {
        let yaml = r#"
container:
  image: "ghcr.io/acme/mcp-tools"
  tag: "1.2.3"
sandbox:
  networking: false
"#;
        let spec: ServerSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.runtime.kind(), "container");
        assert!(spec.runtime.has_server_directory());
        assert!(!spec.sandbox.as_ref().unwrap().networking);
    }

    #[test]
    fn test_shell_and_http_have_no_server_directory() {
        let shell: ServerSpec = serde_yaml::from_str("shell:\n  command: \"cat\"\n").unwrap();
        assert!(!shell.runtime.has_server_directory());

        let http: ServerSpec =
            serde_yaml::from_str("http:\n  url: \"https://mcp.example.com\"\n").unwrap();
        assert!(!http.runtime.has_server_directory());
        assert_eq!(http.runtime.kind(), "http");
    }

    #[test]
    fn test_per_server_upgrade_override() {
        let yaml = r#"
node:
  package: "@modelcontextprotocol/server-memory"
  version: "0.6.0"
installImplicitlyUpgradesChangedPackages: true
"#;
        let spec: ServerSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.install_implicitly_upgrades_changed_packages, Some(true));
    }
}
