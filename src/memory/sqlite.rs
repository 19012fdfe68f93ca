//! SQLite memory store

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::persist::ensure_parent_dir;
use crate::Result;

use super::{MemoryEntry, MemoryStore};

/// Memory kept in a `memory_entries` table, trimmed to the newest N rows.
pub struct SqliteMemoryStore {
    conn: Mutex<Connection>,
    max_entries: usize,
}

impl SqliteMemoryStore {
    pub fn open(path: &Path, max_entries: usize) -> Result<Self> {
        ensure_parent_dir(path)?;
        let conn = Connection::open(path)?;
        let store = Self::with_connection(conn, max_entries)?;
        info!(path = %path.display(), max_entries = store.max_entries, "SQLite memory store opened");
        Ok(store)
    }

    pub fn open_in_memory(max_entries: usize) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, max_entries)
    }

    fn with_connection(conn: Connection, max_entries: usize) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS memory_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prompt TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_memory_created ON memory_entries(created_at);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            max_entries: max_entries.max(1),
        })
    }
}

impl MemoryStore for SqliteMemoryStore {
    fn add_interaction(&self, prompt: &str, response: &str) -> Result<()> {
        let entry = MemoryEntry::now(prompt, response);
        let conn = self.conn.lock()?;

        conn.execute(
            "INSERT INTO memory_entries (prompt, response, created_at) VALUES (?1, ?2, ?3)",
            params![entry.prompt, entry.response, entry.created_at],
        )?;
        conn.execute(
            "DELETE FROM memory_entries
             WHERE id NOT IN (SELECT id FROM memory_entries ORDER BY id DESC LIMIT ?1)",
            params![self.max_entries as i64],
        )?;

        debug!(created_at = %entry.created_at, "Memory entry saved");
        Ok(())
    }

    fn recent(&self) -> Result<Vec<MemoryEntry>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT prompt, response, created_at FROM memory_entries
             ORDER BY id DESC LIMIT ?1",
        )?;

        let mut entries = stmt
            .query_map(params![self.max_entries as i64], |row| {
                Ok(MemoryEntry {
                    prompt: row.get(0)?,
                    response: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        entries.reverse();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_trim_keeps_newest() {
        let store = SqliteMemoryStore::open_in_memory(3).unwrap();
        for i in 0..6 {
            store.add_interaction(&format!("q{i}"), &format!("a{i}")).unwrap();
        }

        let prompts: Vec<_> = store.recent().unwrap().into_iter().map(|e| e.prompt).collect();
        assert_eq!(prompts, vec!["q3", "q4", "q5"]);

        let formatted = store.format_for_prompt().unwrap();
        assert!(formatted.starts_with("User: q3\nAssistant: a3"));
        assert!(formatted.ends_with("User: q5\nAssistant: a5"));
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state/memory.db");

        SqliteMemoryStore::open(&path, 5).unwrap().add_interaction("hi", "hello").unwrap();

        let store = SqliteMemoryStore::open(&path, 5).unwrap();
        assert_eq!(store.recent().unwrap()[0].response, "hello");
    }
}
