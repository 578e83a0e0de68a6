//! Persistence utilities: atomic file writes, JSON and YAML load/save.
//!
//! All writers go through [`atomic_write`] (write to `.tmp`, then rename) so a
//! crashed run never leaves a half-written artifact behind.

use std::io;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Atomically write JSON data to a file.
///
/// Serializes `data` to pretty-printed JSON, writes to a `.tmp` sibling file,
/// then renames to the target path. Creates parent directories if they don't exist.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
    atomic_write(path, json.as_bytes())
}

/// Atomically write YAML data to a file.
pub fn atomic_write_yaml<T: serde::Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let yaml = serde_yaml::to_string(data).map_err(io::Error::other)?;
    atomic_write(path, yaml.as_bytes())
}

/// Atomically write raw bytes to a file.
///
/// Writes to a `.tmp` sibling file, then renames to the target path.
/// Creates parent directories if they don't exist.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load and deserialize JSON from a file.
///
/// Returns `Ok(None)` if the file doesn't exist.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let value =
        serde_json::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(value))
}

/// Load JSON that a previous stage is guaranteed to have written.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    load_json(path)?
        .ok_or_else(|| PipelineError::not_found(format!("{} does not exist", path.display())))
}

/// Load and deserialize a YAML file.
pub fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(PipelineError::not_found(format!(
            "{} does not exist",
            path.display()
        )));
    }
    let data = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&data)?)
}
