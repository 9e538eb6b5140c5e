//! Config file discovery and parsing
//!
//! A workspace holds exactly one `mcpadre.yaml`, `mcpadre.yml`,
//! `mcpadre.toml`, or `mcpadre.json`. The format is dispatched on the
//! extension; having more than one candidate in the same directory is a
//! configuration error.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::schema::SettingsFile;

/// Candidate config file names, in discovery order.
pub const CONFIG_FILE_NAMES: [&str; 4] =
    ["mcpadre.yaml", "mcpadre.yml", "mcpadre.toml", "mcpadre.json"];

/// Locate the config file in `dir`, if any.
///
/// Returns `Ok(None)` when the directory has no config file, and
/// `ConfigAmbiguous` when it has several.
pub fn find_config_file(dir: &Path) -> Result<Option<PathBuf>> {
    let found: Vec<&str> = CONFIG_FILE_NAMES
        .iter()
        .copied()
        .filter(|name| dir.join(name).is_file())
        .collect();

    match found.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(dir.join(single))),
        many => Err(Error::ConfigAmbiguous {
            dir: dir.to_path_buf(),
            found: many.iter().map(|s| s.to_string()).collect(),
        }),
    }
}

/// Walk upward from `start` to the filesystem root looking for a config
/// file. Returns the containing directory and the file path.
pub fn discover_workspace(start: &Path) -> Result<(PathBuf, PathBuf)> {
    let mut current = Some(start.to_path_buf());
    while let Some(dir) = current {
        if let Some(config_path) = find_config_file(&dir)? {
            return Ok((dir, config_path));
        }
        current = dir.parent().map(Path::to_path_buf);
    }
    Err(Error::ConfigMissing {
        start: start.to_path_buf(),
    })
}

/// Parse one config file, dispatching on its extension.
pub fn load_settings_file(path: &Path) -> Result<SettingsFile> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match extension {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| Error::ConfigInvalid {
            path: path.to_path_buf(),
            format: "yaml".to_string(),
            message: e.to_string(),
        }),
        "toml" => toml::from_str(&content).map_err(|e| Error::ConfigInvalid {
            path: path.to_path_buf(),
            format: "toml".to_string(),
            message: e.to_string(),
        }),
        "json" => serde_json::from_str(&content).map_err(|e| Error::ConfigInvalid {
            path: path.to_path_buf(),
            format: "json".to_string(),
            message: e.to_string(),
        }),
        other => Err(Error::ConfigInvalid {
            path: path.to_path_buf(),
            format: other.to_string(),
            message: "unsupported config format".to_string(),
        }),
    }
}
