//! Atomic file writes for materialized manifests

use std::fs::{self, OpenOptions};
use std::io::Write;

use crate::error::{Error, Result};
use crate::path::NormalizedPath;

/// Write content atomically using write-to-temp-then-rename.
///
/// Concurrent mutation of a server directory is already serialized by the
/// per-server lock (see [`crate::lock`]); this guards against partial
/// writes, not races.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();
    tracing::debug!(path = %path.as_str(), content_len = content.len(), "atomic write");

    if let Some(parent) = native_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let result = (|| {
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| Error::io(&temp_path, e))?;
        temp_file
            .write_all(content)
            .map_err(|e| Error::io(&temp_path, e))?;
        temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
        // Close before rename (improves Windows reliability)
        drop(temp_file);
        fs::rename(&temp_path, &native_path).map_err(|e| Error::io(&native_path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Write text content to a file atomically.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Write text only when the on-disk content differs.
///
/// Returns `true` when a write happened. Re-running `install` with an
/// unchanged config must leave manifests bit-for-bit identical, including
/// their mtimes, so unchanged files are never rewritten.
pub fn write_text_if_changed(path: &NormalizedPath, content: &str) -> Result<bool> {
    if path.is_file() && read_text(path)? == content {
        return Ok(false);
    }
    write_text(path, content)?;
    Ok(true)
}
