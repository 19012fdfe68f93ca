//! Mailbox - append-only trace of agent-to-agent messages
//!
//! Every hand-off in a planner/executor run is recorded here under one
//! thread id. Messages are never mutated or deleted; the log exists so a
//! run can be inspected afterwards (`gale mailbox`).

mod json;
mod sqlite;

pub use json::JsonMailbox;
pub use sqlite::SqliteMailbox;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::persist::StorageBackend;
use crate::Result;

/// Message body: a small JSON object such as `{"plan": "..."}`.
pub type Content = Map<String, Value>;

/// One stored mailbox message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailboxMessage {
    pub sender: String,
    pub recipient: String,
    pub content: Content,
    pub thread_id: String,
    pub timestamp: String,
}

impl MailboxMessage {
    pub fn new(sender: &str, recipient: &str, content: Content, thread_id: &str) -> Self {
        Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            content,
            thread_id: thread_id.to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Per-thread overview used by the mailbox viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub thread_id: String,
    pub message_count: usize,
    pub first_timestamp: String,
    pub last_timestamp: String,
}

/// Mailbox trait - append and query by thread
pub trait Mailbox: Send + Sync {
    /// Append one message and persist it
    fn send(
        &self,
        sender: &str,
        recipient: &str,
        content: Content,
        thread_id: &str,
    ) -> Result<MailboxMessage>;

    /// All messages of a thread, in insertion order
    fn thread_messages(&self, thread_id: &str) -> Result<Vec<MailboxMessage>>;

    /// Most recently active threads first, at most `limit`
    fn threads(&self, limit: usize) -> Result<Vec<ThreadSummary>>;
}

/// Open the mailbox backing `path`, choosing the engine by extension.
pub fn open(path: &Path) -> Result<Box<dyn Mailbox>> {
    Ok(match StorageBackend::for_path(path) {
        StorageBackend::Sqlite => Box::new(SqliteMailbox::open(path)?),
        StorageBackend::Json => Box::new(JsonMailbox::open(path)),
    })
}

/// Build message content from key/value pairs.
pub fn content<const N: usize>(pairs: [(&str, &str); N]) -> Content {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

/// Summarize threads from messages held in insertion order.
fn summarize(messages: &[MailboxMessage], limit: usize) -> Vec<ThreadSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut by_thread: HashMap<&str, ThreadSummary> = HashMap::new();

    for m in messages {
        let summary = by_thread.entry(m.thread_id.as_str()).or_insert_with(|| {
            order.push(m.thread_id.clone());
            ThreadSummary {
                thread_id: m.thread_id.clone(),
                message_count: 0,
                first_timestamp: m.timestamp.clone(),
                last_timestamp: m.timestamp.clone(),
            }
        });
        summary.message_count += 1;
        if m.timestamp < summary.first_timestamp {
            summary.first_timestamp = m.timestamp.clone();
        }
        if m.timestamp > summary.last_timestamp {
            summary.last_timestamp = m.timestamp.clone();
        }
    }

    let mut summaries: Vec<ThreadSummary> = order
        .iter()
        .filter_map(|id| by_thread.remove(id.as_str()))
        .collect();
    // Newest first; on equal timestamps the later-created thread wins.
    summaries.reverse();
    summaries.sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp));
    summaries.truncate(limit);
    summaries
}

/// In-memory mailbox for testing
#[derive(Default)]
pub struct InMemoryMailbox {
    messages: Mutex<Vec<MailboxMessage>>,
}

impl InMemoryMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Result<Vec<MailboxMessage>> {
        Ok(self.messages.lock()?.clone())
    }
}

impl Mailbox for InMemoryMailbox {
    fn send(
        &self,
        sender: &str,
        recipient: &str,
        content: Content,
        thread_id: &str,
    ) -> Result<MailboxMessage> {
        let message = MailboxMessage::new(sender, recipient, content, thread_id);
        self.messages.lock()?.push(message.clone());
        Ok(message)
    }

    fn thread_messages(&self, thread_id: &str) -> Result<Vec<MailboxMessage>> {
        Ok(self
            .messages
            .lock()?
            .iter()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect())
    }

    fn threads(&self, limit: usize) -> Result<Vec<ThreadSummary>> {
        Ok(summarize(&self.messages.lock()?, limit))
    }
}
