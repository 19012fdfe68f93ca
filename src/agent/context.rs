//! Context builder for agent prompts.
//!
//! The only context carried between runs is the bounded memory window; it
//! is rendered once into a synthetic user message ahead of the prompt.

use tracing::{debug, warn};

use crate::memory::MemoryStore;

use super::message::Message;

/// Header of the synthetic message carrying recalled interactions.
pub const MEMORY_CONTEXT_HEADER: &str = "Previous conversation context:\n";

/// Log previews are cut to this many characters.
const PREVIEW_LEN: usize = 120;

/// Build the initial message list for one run.
pub fn build_messages(memory: Option<&dyn MemoryStore>, prompt: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);

    if let Some(memory) = memory {
        match memory.format_for_prompt() {
            Ok(context) if !context.is_empty() => {
                debug!(chars = context.len(), "Memory context attached");
                messages.push(Message::user(format!("{MEMORY_CONTEXT_HEADER}{context}")));
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to read memory context, continuing without it"),
        }
    }

    messages.push(Message::user(prompt));
    messages
}

/// Single-line preview of `text` for logs.
pub fn preview(text: &str) -> String {
    let clean = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if clean.chars().count() <= PREVIEW_LEN {
        return clean;
    }
    let cut: String = clean.chars().take(PREVIEW_LEN - 3).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::Role;
    use crate::memory::InMemoryStore;

    #[test]
    fn test_build_messages_without_memory() {
        let messages = build_messages(None, "Hello");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Hello");
    }

    #[test]
    fn test_build_messages_empty_memory_adds_nothing() {
        let store = InMemoryStore::new(5);
        let messages = build_messages(Some(&store), "Hello");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_build_messages_with_memory() {
        let store = InMemoryStore::new(5);
        store.add_interaction("weather in Berlin", "12C, light rain.").unwrap();

        let messages = build_messages(Some(&store), "and tomorrow?");
        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.starts_with(MEMORY_CONTEXT_HEADER));
        assert!(messages[0].content.contains("User: weather in Berlin"));
        assert!(messages[0].content.contains("Assistant: 12C, light rain."));
        assert_eq!(messages[1].content, "and tomorrow?");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("  a \n b  "), "a b");
        let long = "x".repeat(500);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_LEN);
        assert!(p.ends_with("..."));
    }
}
