//! Filesystem helpers shared by the configuration manager and the stages.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Read a YAML document and deserialize it.
///
/// An empty (or whitespace-only) document is rejected rather than
/// deserialized into defaults, so a truncated config never goes unnoticed.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read yaml file {}", path.display()))?;

    if content.trim().is_empty() {
        anyhow::bail!("yaml file is empty: {}", path.display());
    }

    let value = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse yaml file {}", path.display()))?;
    tracing::info!("yaml file: {} loaded successfully", path.display());

    Ok(value)
}

/// Create every directory in `paths`, including missing parents.
pub fn create_directories<P: AsRef<Path>>(paths: &[P]) -> Result<()> {
    for path in paths {
        let path = path.as_ref();
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
        tracing::debug!("created directory at: {}", path.display());
    }
    Ok(())
}

/// Create `<dir>/.gitkeep` if it does not exist yet.
pub fn ensure_gitkeep(dir: &Path) -> Result<()> {
    let file_path = dir.join(".gitkeep");
    if !file_path.exists() {
        tracing::info!("Creating file: .gitkeep in directory {}", dir.display());
        fs::write(&file_path, "")
            .with_context(|| format!("Failed to create {}", file_path.display()))?;
    }
    Ok(())
}

pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize json")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("json file saved at: {}", path.display());
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read json file {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse json file {}", path.display()))?;
    tracing::info!("json file loaded successfully from: {}", path.display());
    Ok(value)
}

/// File size rounded to whole kilobytes.
pub fn file_size_kb(path: &Path) -> Result<u64> {
    let bytes = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    Ok((bytes as f64 / 1024.0).round() as u64)
}
