//! LLM client abstraction layer.
//!
//! This module provides:
//! - [`LlmClient`] trait, the model oracle every agent talks to
//! - [`GeminiClient`], the Gemini REST implementation
//!
//! Provider-specific response shapes are normalized inside the client, so
//! the agent loop only ever sees [`LlmResponse`] and [`ToolCallRequest`].

mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolDefinition;
use crate::Result;

pub use types::*;

pub mod gemini;

pub use gemini::GeminiClient;

use super::message::{Message, ToolCallRequest};

/// Response from an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Text content of the response.
    pub content: Option<String>,

    /// Tool calls requested by the LLM.
    pub tool_calls: Vec<ToolCallRequest>,

    /// Reason the response finished.
    pub finish_reason: String,

    /// Token usage statistics.
    pub usage: Usage,

    /// The provider's content block, kept so it can be echoed back verbatim.
    pub raw_content: Option<Value>,
}

impl LlmResponse {
    /// Create a simple text response.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
            usage: Usage::default(),
            raw_content: None,
        }
    }

    /// Create a response requesting tool calls.
    pub fn tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: None,
            tool_calls,
            finish_reason: "tool_calls".to_string(),
            usage: Usage::default(),
            raw_content: None,
        }
    }

    /// Check if response has tool calls.
    #[inline]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// LLM client trait - swappable provider abstraction.
///
/// One call is one stateless round-trip: the full conversation, the tool
/// declarations and the optional system instruction go out every time.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send messages and get response.
    async fn chat(
        &self,
        system: Option<&str>,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse>;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;
}

/// One request as seen by [`FakeLlmClient`].
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Fake LLM client for testing.
///
/// Replays scripted responses in order and records every request. When the
/// script runs out it either errors or, with [`FakeLlmClient::looping_tool_call`],
/// keeps requesting the same tool forever.
#[cfg(test)]
pub struct FakeLlmClient {
    responses: std::sync::Mutex<std::collections::VecDeque<LlmResponse>>,
    fallback: Option<LlmResponse>,
    requests: std::sync::Mutex<Vec<RecordedRequest>>,
}

#[cfg(test)]
impl FakeLlmClient {
    /// Create with predefined text responses.
    pub fn new(responses: Vec<&str>) -> Self {
        Self::scripted(responses.iter().map(|s| LlmResponse::text(*s)).collect())
    }

    /// Create with arbitrary responses.
    pub fn scripted(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            fallback: None,
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Create with a single tool call followed by a text response.
    pub fn with_tool_call(name: &str, args: Value, final_response: &str) -> Self {
        Self::scripted(vec![
            LlmResponse::tool_calls(vec![ToolCallRequest {
                name: name.to_string(),
                arguments: args,
            }]),
            LlmResponse::text(final_response),
        ])
    }

    /// Always request the same tool call.
    pub fn looping_tool_call(name: &str) -> Self {
        Self {
            fallback: Some(LlmResponse::tool_calls(vec![ToolCallRequest {
                name: name.to_string(),
                arguments: serde_json::json!({}),
            }])),
            ..Self::scripted(vec![])
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn chat(
        &self,
        system: Option<&str>,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        self.requests.lock().unwrap().push(RecordedRequest {
            system: system.map(str::to_string),
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
        });

        let mut responses = self.responses.lock().unwrap();
        responses
            .pop_front()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| crate::Error::Llm("No more fake responses".to_string()))
    }

    fn default_model(&self) -> &str {
        "fake-model"
    }
}
