//! pyproject.toml generation and inspection
//!
//! The Python manager derives the whole dependency manifest from the
//! server spec: one project named `mcpadre-deps-<server>`, one pinned
//! dependency, one `requires-python` expression. Generation goes through
//! `toml_edit` so repeated installs stay byte-for-byte identical.

use toml_edit::{Array, DocumentMut, Item, Table, value};

use crate::error::{Error, Result};

/// The fields mcpadre owns inside a generated pyproject.toml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PyprojectFields {
    pub name: String,
    pub requires_python: String,
    /// The single pinned dependency, e.g. `mcp-pypi==2.6.5`.
    pub dependency: String,
}

/// Render the manifest for one server.
pub fn generate_pyproject(server_name: &str, package: &str, version: &str, requires_python: &str)
-> String {
    let mut doc = DocumentMut::new();

    let mut project = Table::new();
    project.insert("name", value(format!("mcpadre-deps-{server_name}")));
    project.insert("version", value("0.0.0"));
    project.insert("requires-python", value(requires_python));
    let mut dependencies = Array::new();
    dependencies.push(format!("{package}=={version}"));
    project.insert("dependencies", value(dependencies));

    doc.insert("project", Item::Table(project));
    doc.to_string()
}

/// Extract the mcpadre-owned fields from an existing pyproject.toml.
pub fn parse_pyproject(content: &str) -> Result<PyprojectFields> {
    let doc: DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| {
        Error::InstallFailed {
            step: "parse pyproject.toml".to_string(),
            detail: e.to_string(),
        }
    })?;

    let project = doc
        .get("project")
        .and_then(Item::as_table)
        .ok_or_else(|| Error::InstallFailed {
            step: "parse pyproject.toml".to_string(),
            detail: "missing [project] table".to_string(),
        })?;

    let get_str = |key: &str| -> Result<String> {
        project
            .get(key)
            .and_then(Item::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::InstallFailed {
                step: "parse pyproject.toml".to_string(),
                detail: format!("missing project.{key}"),
            })
    };

    let dependency = project
        .get("dependencies")
        .and_then(Item::as_array)
        .and_then(|a| a.get(0))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InstallFailed {
            step: "parse pyproject.toml".to_string(),
            detail: "missing project.dependencies".to_string(),
        })?;

    Ok(PyprojectFields {
        name: get_str("name")?,
        requires_python: get_str("requires-python")?,
        dependency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_generate_parse_roundtrip() {
        let content = generate_pyproject("pypi-docs", "mcp-pypi", "2.6.5", "==3.11.11");
        let fields = parse_pyproject(&content).unwrap();
        assert_eq!(
            fields,
            PyprojectFields {
                name: "mcpadre-deps-pypi-docs".to_string(),
                requires_python: "==3.11.11".to_string(),
                dependency: "mcp-pypi==2.6.5".to_string(),
            }
        );
    }

    #[test]
    fn test_generate_is_deterministic() {
        let a = generate_pyproject("s", "pkg", "1.0.0", ">=3.12");
        let b = generate_pyproject("s", "pkg", "1.0.0", ">=3.12");
        assert_eq!(a, b);
    }

    #[test]
    fn test_generated_shape() {
        let content = generate_pyproject("s", "pkg", "1.2.3", ">=3.12");
        assert!(content.contains("[project]"));
        assert!(content.contains("name = \"mcpadre-deps-s\""));
        assert!(content.contains("requires-python = \">=3.12\""));
        assert!(content.contains("\"pkg==1.2.3\""));
    }

    #[test]
    fn test_parse_rejects_missing_project() {
        assert!(parse_pyproject("[tool.other]\nx = 1\n").is_err());
    }

    #[test]
    fn test_parse_rejects_empty_dependencies() {
        let content = "[project]\nname = \"x\"\nrequires-python = \">=3.12\"\ndependencies = []\n";
        assert!(parse_pyproject(content).is_err());
    }
}
