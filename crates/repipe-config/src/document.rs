//! Persisting configuration values as JSON documents.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::value::ConfigValue;

/// Render a configuration value as a pretty-printed document with a trailing newline.
pub fn to_document_string(value: &ConfigValue) -> Result<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

pub fn from_document_str(text: &str) -> Result<ConfigValue> {
    Ok(serde_json::from_str(text)?)
}

/// Read one configuration document from disk.
pub fn read_document(path: &Path) -> Result<ConfigValue> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::io(path, source))?;
    let value = from_document_str(&text)?;
    tracing::debug!(path = %path.display(), "read configuration document");
    Ok(value)
}

/// Write one configuration document to disk, creating parent directories.
pub fn write_document(path: &Path, value: &ConfigValue) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::io(parent, source))?;
    }
    let text = to_document_string(value)?;
    fs::write(path, text).map_err(|source| ConfigError::io(path, source))?;
    tracing::info!(path = %path.display(), "wrote configuration document");
    Ok(())
}
