//! Memory module - bounded recent-history window
//!
//! Keeps the last N prompt/response pairs so the single agent can see what
//! was said before. Two persistent backends ([`JsonMemoryStore`],
//! [`SqliteMemoryStore`]) and an in-memory one for tests.

mod json;
mod sqlite;

pub use json::JsonMemoryStore;
pub use sqlite::SqliteMemoryStore;

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::persist::StorageBackend;
use crate::Result;

/// One remembered interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub prompt: String,
    pub response: String,
    pub created_at: String,
}

impl MemoryEntry {
    pub fn now(prompt: &str, response: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            response: response.to_string(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Memory store trait - interface for persistent memory
pub trait MemoryStore: Send + Sync {
    /// Record an interaction, keeping only the newest N
    fn add_interaction(&self, prompt: &str, response: &str) -> Result<()>;

    /// Retained entries, oldest first
    fn recent(&self) -> Result<Vec<MemoryEntry>>;

    /// Render retained entries as `User:` / `Assistant:` lines, oldest first.
    /// Empty when nothing is stored.
    fn format_for_prompt(&self) -> Result<String> {
        let lines: Vec<String> = self
            .recent()?
            .into_iter()
            .flat_map(|e| [format!("User: {}", e.prompt), format!("Assistant: {}", e.response)])
            .collect();
        Ok(lines.join("\n"))
    }
}

/// Open the memory store backing `path`, choosing the engine by extension.
pub fn open(path: &Path, max_entries: usize) -> Result<Box<dyn MemoryStore>> {
    Ok(match StorageBackend::for_path(path) {
        StorageBackend::Sqlite => Box::new(SqliteMemoryStore::open(path, max_entries)?),
        StorageBackend::Json => Box::new(JsonMemoryStore::open(path, max_entries)),
    })
}

/// Drop the oldest entries so at most `max` remain.
fn trim_to(entries: &mut Vec<MemoryEntry>, max: usize) {
    if entries.len() > max {
        let excess = entries.len() - max;
        entries.drain(..excess);
    }
}

/// In-memory store for testing
pub struct InMemoryStore {
    entries: Mutex<Vec<MemoryEntry>>,
    max_entries: usize,
}

impl InMemoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            max_entries: max_entries.max(1),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(10)
    }
}

impl MemoryStore for InMemoryStore {
    fn add_interaction(&self, prompt: &str, response: &str) -> Result<()> {
        let mut entries = self.entries.lock()?;
        entries.push(MemoryEntry::now(prompt, response));
        trim_to(&mut entries, self.max_entries);
        Ok(())
    }

    fn recent(&self) -> Result<Vec<MemoryEntry>> {
        Ok(self.entries.lock()?.clone())
    }
}
