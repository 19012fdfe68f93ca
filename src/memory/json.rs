//! JSON-file memory store

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use crate::persist::{load_json_array, save_json_array};
use crate::Result;

use super::{trim_to, MemoryEntry, MemoryStore};

/// Memory kept as a JSON array on disk, rewritten on every write.
pub struct JsonMemoryStore {
    path: PathBuf,
    max_entries: usize,
    entries: Mutex<Vec<MemoryEntry>>,
}

impl JsonMemoryStore {
    /// Open the store. A missing or corrupt file starts empty.
    pub fn open(path: &Path, max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        let mut entries: Vec<MemoryEntry> = load_json_array(path);
        trim_to(&mut entries, max_entries);
        info!(path = %path.display(), entries = entries.len(), max_entries, "Memory store opened");

        Self {
            path: path.to_path_buf(),
            max_entries,
            entries: Mutex::new(entries),
        }
    }
}

impl MemoryStore for JsonMemoryStore {
    fn add_interaction(&self, prompt: &str, response: &str) -> Result<()> {
        let mut entries = self.entries.lock()?;
        let snapshot = entries.clone();
        entries.push(MemoryEntry::now(prompt, response));
        trim_to(&mut entries, self.max_entries);

        if let Err(e) = save_json_array(&self.path, entries.as_slice()) {
            *entries = snapshot;
            return Err(e);
        }
        debug!(entries = entries.len(), "Memory entry saved");
        Ok(())
    }

    fn recent(&self) -> Result<Vec<MemoryEntry>> {
        Ok(self.entries.lock()?.clone())
    }
}
