//! Wire types for Gemini `generateContent` responses.

use serde::Deserialize;
use serde_json::Value;

use super::super::message::ToolCallRequest;

/// Top-level Gemini API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
    /// Present when the prompt itself was blocked.
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

/// A single response candidate.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Absent when generation was stopped early (e.g. safety).
    pub content: Option<Value>,
    pub finish_reason: Option<String>,
}

/// Content block containing parts.
#[derive(Debug, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single part of the response (text or function call).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub text: Option<String>,
    #[serde(alias = "function_call")]
    pub function_call: Option<FunctionCall>,
    /// Thinking-model summaries; never part of the answer.
    #[serde(default)]
    pub thought: bool,
}

/// Function call requested by the model.
///
/// Some responses carry the call fields directly, others wrap them in a
/// nested `functionCall` object. Both are accepted.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    pub name: Option<String>,
    pub args: Option<Value>,
    #[serde(alias = "function_call")]
    pub function_call: Option<Box<FunctionCall>>,
}

impl FunctionCall {
    fn resolved_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.function_call.as_ref().and_then(|f| f.resolved_name()))
    }

    fn resolved_args(&self) -> Option<&Value> {
        self.args
            .as_ref()
            .filter(|a| !a.is_null())
            .or_else(|| self.function_call.as_ref().and_then(|f| f.resolved_args()))
    }

    /// Normalize into the canonical request shape.
    pub fn to_request(&self) -> ToolCallRequest {
        ToolCallRequest {
            name: self.resolved_name().unwrap_or("unknown").to_string(),
            arguments: self
                .resolved_args()
                .cloned()
                .unwrap_or_else(|| Value::Object(Default::default())),
        }
    }
}

/// Token usage metadata.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<usize>,
    pub candidates_token_count: Option<usize>,
    pub total_token_count: Option<usize>,
}
