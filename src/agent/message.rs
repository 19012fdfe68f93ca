//! Message types for agent communication

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolOutcome;

/// Message role in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    Tool,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,

    /// Tool calls made by the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,

    /// Results of tool calls (role = tool)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,

    /// Provider content block, echoed back verbatim on the next turn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            tool_calls: vec![],
            tool_results: vec![],
            raw: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a model message
    pub fn model(content: impl Into<String>) -> Self {
        Self::with_role(Role::Model, content.into())
    }

    /// Create a model message carrying tool calls
    pub fn model_with_tools(
        content: impl Into<String>,
        tool_calls: Vec<ToolCallRequest>,
        raw: Option<Value>,
    ) -> Self {
        Self {
            tool_calls,
            raw,
            ..Self::with_role(Role::Model, content.into())
        }
    }

    /// Create one message carrying every tool result of a turn
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            tool_results: results,
            ..Self::with_role(Role::Tool, String::new())
        }
    }
}

/// A tool call request from the LLM, normalized from whatever shape the
/// provider used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Value,
}

/// The outcome of one tool call, tagged with the tool that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub outcome: ToolOutcome,
}
