//! SQLite mailbox

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, Row};
use tracing::{debug, info, warn};

use crate::persist::ensure_parent_dir;
use crate::Result;

use super::{Content, Mailbox, MailboxMessage, ThreadSummary};

/// Mailbox stored in a `mailbox_messages` table indexed by thread id.
pub struct SqliteMailbox {
    conn: Mutex<Connection>,
}

impl SqliteMailbox {
    pub fn open(path: &Path) -> Result<Self> {
        ensure_parent_dir(path)?;
        let mailbox = Self::with_connection(Connection::open(path)?)?;
        info!(path = %path.display(), "SQLite mailbox opened");
        Ok(mailbox)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS mailbox_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender TEXT NOT NULL,
                recipient TEXT NOT NULL,
                content TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_mailbox_thread ON mailbox_messages(thread_id);",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<MailboxMessage> {
    let raw: String = row.get(2)?;
    let content = match serde_json::from_str::<Content>(&raw) {
        Ok(content) => content,
        Err(e) => {
            // Keep the row readable even if the stored body is not an object.
            warn!(error = %e, "Mailbox row has invalid content JSON");
            let mut content = Content::new();
            content.insert("raw".to_string(), serde_json::Value::String(raw));
            content
        }
    };

    Ok(MailboxMessage {
        sender: row.get(0)?,
        recipient: row.get(1)?,
        content,
        thread_id: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

impl Mailbox for SqliteMailbox {
    fn send(
        &self,
        sender: &str,
        recipient: &str,
        content: Content,
        thread_id: &str,
    ) -> Result<MailboxMessage> {
        let message = MailboxMessage::new(sender, recipient, content, thread_id);
        let body = serde_json::to_string(&message.content)?;

        self.conn.lock()?.execute(
            "INSERT INTO mailbox_messages (sender, recipient, content, thread_id, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![message.sender, message.recipient, body, message.thread_id, message.timestamp],
        )?;

        info!(thread = %thread_id, sender, recipient, "Mailbox message saved");
        Ok(message)
    }

    fn thread_messages(&self, thread_id: &str) -> Result<Vec<MailboxMessage>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT sender, recipient, content, thread_id, timestamp
             FROM mailbox_messages WHERE thread_id = ?1 ORDER BY id ASC",
        )?;
        let messages = stmt
            .query_map(params![thread_id], row_to_message)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(thread = %thread_id, messages = messages.len(), "Mailbox thread lookup");
        Ok(messages)
    }

    fn threads(&self, limit: usize) -> Result<Vec<ThreadSummary>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT thread_id, COUNT(*), MIN(timestamp), MAX(timestamp), MAX(id)
             FROM mailbox_messages
             GROUP BY thread_id
             ORDER BY MAX(timestamp) DESC, MAX(id) DESC
             LIMIT ?1",
        )?;
        let summaries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(ThreadSummary {
                    thread_id: row.get(0)?,
                    message_count: row.get::<_, i64>(1)? as usize,
                    first_timestamp: row.get(2)?,
                    last_timestamp: row.get(3)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(summaries)
    }
}
