//! Configuration schema types
//!
//! Serde-derived types mirroring the on-disk `mcpadre.{yaml,toml,json}`
//! structure. All field names are camelCase on disk.

pub mod options;
pub mod sandbox;
pub mod server;
pub mod template;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use options::GlobalOptionsFile;
use server::ServerSpec;

/// One configuration file as written by the user, before scope merging.
///
/// All option fields are optional so that the project/user merge can tell
/// "unset" apart from "explicitly set to the default".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsFile {
    /// Configured MCP servers, keyed by server name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mcp_servers: BTreeMap<String, ServerSpec>,

    /// Host enablement map. Opaque to the execution core; host config
    /// generators consume it.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hosts: BTreeMap<String, bool>,

    /// Workspace-wide options.
    #[serde(default, skip_serializing_if = "GlobalOptionsFile::is_empty")]
    pub options: GlobalOptionsFile,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::server::RuntimeSpec;

    #[test]
    fn test_yaml_roundtrip_minimal() {
        let yaml = r#"
mcpServers:
  memory:
    node:
      package: "@modelcontextprotocol/server-memory"
      version: "0.6.0"
"#;
        let file: SettingsFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(file.mcp_servers.len(), 1);
        let spec = &file.mcp_servers["memory"];
        match &spec.runtime {
            RuntimeSpec::Node(node) => {
                assert_eq!(node.package, "@modelcontextprotocol/server-memory");
                assert_eq!(node.version, "0.6.0");
            }
            other => panic!("expected node spec, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_runtime_variant_is_rejected() {
        let yaml = r#"
mcpServers:
  broken:
    golang:
      package: "x"
"#;
        let parsed: std::result::Result<SettingsFile, _> = serde_yaml::from_str(yaml);
        assert!(parsed.is_err());
    }
}
