//! Shared helpers for the file-backed stores.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::Result;

/// Which storage engine backs a store file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Pretty-printed JSON array, rewritten on every append.
    Json,
    /// Embedded SQLite database.
    Sqlite,
}

impl StorageBackend {
    /// Pick the backend from the file extension (`.db`, `.sqlite`, `.sqlite3`
    /// mean SQLite, anything else JSON).
    pub fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("db" | "sqlite" | "sqlite3") => StorageBackend::Sqlite,
            _ => StorageBackend::Json,
        }
    }
}

/// Load a JSON array of records.
///
/// A missing file is empty. An unreadable or malformed file is also treated
/// as empty, with a warning; rows that fail to deserialize are skipped.
pub fn load_json_array<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    if !path.exists() {
        debug!(path = %path.display(), "Store file does not exist yet");
        return Vec::new();
    }

    let data: Value = match std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| serde_json::from_str(&text).map_err(|e| e.to_string()))
    {
        Ok(data) => data,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read store file, starting empty");
            return Vec::new();
        }
    };

    let Value::Array(items) = data else {
        warn!(path = %path.display(), "Store file has invalid format (expected list), starting empty");
        return Vec::new();
    };

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if records.len() < total {
        warn!(
            path = %path.display(),
            skipped = total - records.len(),
            "Skipped malformed rows in store file"
        );
    }
    records
}

/// Persist a full JSON array, replacing the file atomically.
pub fn save_json_array<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    ensure_parent_dir(path)?;

    let content = serde_json::to_string_pretty(records)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), records = records.len(), "Store file saved");
    Ok(())
}

/// Create the parent directory of a database file if needed.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
