//! JSON-file mailbox

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use crate::persist::{load_json_array, save_json_array};
use crate::Result;

use super::{summarize, Content, Mailbox, MailboxMessage, ThreadSummary};

/// Mailbox stored as one JSON array, fully rewritten on every append.
pub struct JsonMailbox {
    path: PathBuf,
    messages: Mutex<Vec<MailboxMessage>>,
}

impl JsonMailbox {
    /// Open the mailbox. A missing or corrupt file starts empty.
    pub fn open(path: &Path) -> Self {
        let messages: Vec<MailboxMessage> = load_json_array(path);
        info!(path = %path.display(), messages = messages.len(), "Mailbox opened");

        Self {
            path: path.to_path_buf(),
            messages: Mutex::new(messages),
        }
    }
}

impl Mailbox for JsonMailbox {
    fn send(
        &self,
        sender: &str,
        recipient: &str,
        content: Content,
        thread_id: &str,
    ) -> Result<MailboxMessage> {
        let message = MailboxMessage::new(sender, recipient, content, thread_id);
        let mut messages = self.messages.lock()?;
        messages.push(message.clone());

        if let Err(e) = save_json_array(&self.path, messages.as_slice()) {
            // Keep memory and disk in step.
            messages.pop();
            return Err(e);
        }

        info!(
            thread = %thread_id,
            sender,
            recipient,
            content_keys = ?message.content.keys().collect::<Vec<_>>(),
            "Mailbox message saved"
        );
        Ok(message)
    }

    fn thread_messages(&self, thread_id: &str) -> Result<Vec<MailboxMessage>> {
        let messages: Vec<MailboxMessage> = self
            .messages
            .lock()?
            .iter()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect();
        debug!(thread = %thread_id, messages = messages.len(), "Mailbox thread lookup");
        Ok(messages)
    }

    fn threads(&self, limit: usize) -> Result<Vec<ThreadSummary>> {
        Ok(summarize(&self.messages.lock()?, limit))
    }
}
