//! Gemini LLM client implementation (API key authentication).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::Error;
use crate::tools::ToolDefinition;
use crate::Result;

use super::super::message::{Message, Role};
use super::{Content, GeminiResponse, LlmClient, LlmResponse, Usage};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API client using API key authentication.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client with API key.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Point the client at a different endpoint (proxies, local mocks).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_url(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    /// Convert conversation messages into Gemini `contents`.
    ///
    /// Function responses are sent in a `user`-role block, which is what the
    /// REST API expects as the reply to a model `functionCall` turn.
    pub(crate) fn convert_messages(&self, messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| match m.role {
                Role::Tool => {
                    let parts: Vec<Value> = m
                        .tool_results
                        .iter()
                        .map(|r| {
                            json!({
                                "functionResponse": {
                                    "name": r.name,
                                    "response": r.outcome.to_value()
                                }
                            })
                        })
                        .collect();

                    json!({
                        "role": "user",
                        "parts": parts
                    })
                }
                Role::Model => {
                    if let Some(raw) = &m.raw {
                        return raw.clone();
                    }

                    let mut parts: Vec<Value> = Vec::new();
                    if !m.content.is_empty() {
                        parts.push(json!({"text": m.content}));
                    }
                    parts.extend(m.tool_calls.iter().map(|tc| {
                        json!({
                            "functionCall": {
                                "name": tc.name,
                                "args": tc.arguments
                            }
                        })
                    }));

                    json!({
                        "role": "model",
                        "parts": parts
                    })
                }
                Role::User => json!({
                    "role": "user",
                    "parts": [{"text": m.content}]
                }),
            })
            .collect()
    }

    pub(crate) fn convert_tools(&self, tools: &[ToolDefinition]) -> Option<Value> {
        if tools.is_empty() {
            return None;
        }

        let function_declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters
                })
            })
            .collect();

        Some(json!([{
            "functionDeclarations": function_declarations
        }]))
    }

    pub(crate) fn build_request(
        &self,
        system: Option<&str>,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Value {
        let mut request = json!({
            "contents": self.convert_messages(messages),
            "generationConfig": {
                "temperature": 0.7,
                "maxOutputTokens": 8192
            }
        });

        if let Some(system) = system.filter(|s| !s.is_empty()) {
            request["systemInstruction"] = json!({
                "parts": [{"text": system}]
            });
        }

        if let Some(tool_config) = self.convert_tools(tools) {
            request["tools"] = tool_config;
        }

        request
    }

    pub(crate) fn parse_response(&self, response: &GeminiResponse) -> Result<LlmResponse> {
        let usage = response
            .usage_metadata
            .as_ref()
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count.unwrap_or(0),
                completion_tokens: u.candidates_token_count.unwrap_or(0),
                total_tokens: u.total_token_count.unwrap_or(0),
            })
            .unwrap_or_default();

        let Some(candidate) = response.candidates.first() else {
            let block_reason = response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref())
                .unwrap_or("none");
            warn!(block_reason, "Gemini returned no candidates");
            return Ok(LlmResponse {
                content: None,
                tool_calls: Vec::new(),
                finish_reason: "blocked".to_string(),
                usage,
                raw_content: None,
            });
        };

        let content: Content = match &candidate.content {
            Some(raw) => serde_json::from_value(raw.clone())?,
            None => Content::default(),
        };

        let mut text = String::new();
        let mut has_text = false;
        let mut tool_calls = Vec::new();

        for part in &content.parts {
            if let Some(ref t) = part.text {
                if !part.thought {
                    text.push_str(t);
                    has_text = true;
                }
            }

            if let Some(ref fc) = part.function_call {
                tool_calls.push(fc.to_request());
            }
        }

        let raw_content = candidate
            .content
            .clone()
            .unwrap_or_else(|| json!({"role": "model", "parts": []}));

        Ok(LlmResponse {
            content: has_text.then_some(text),
            tool_calls,
            finish_reason: candidate
                .finish_reason
                .clone()
                .unwrap_or_else(|| "stop".to_string()),
            usage,
            raw_content: Some(raw_content),
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn chat(
        &self,
        system: Option<&str>,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse> {
        let request = self.build_request(system, messages, tools);
        debug!(model = %self.model, contents = messages.len(), tools = tools.len(), "Gemini request");

        let response = self
            .client
            .post(self.build_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            return Err(Error::Llm(format!("Gemini API error ({status}): {error_text}")));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let parsed = self.parse_response(&gemini_response)?;
        debug!(
            finish_reason = %parsed.finish_reason,
            tool_calls = parsed.tool_calls.len(),
            total_tokens = parsed.usage.total_tokens,
            "Gemini response"
        );
        Ok(parsed)
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::{ToolCallRequest, ToolResult};
    use crate::tools::ToolOutcome;

    fn client() -> GeminiClient {
        GeminiClient::new("test-key", "gemini-test")
    }

    fn parse(value: Value) -> Result<LlmResponse> {
        let response: GeminiResponse = serde_json::from_value(value).unwrap();
        client().parse_response(&response)
    }

    #[test]
    fn test_build_url_keeps_key_out_of_query() {
        let url = client().with_base_url("http://localhost:9000/models/").build_url();
        assert_eq!(url, "http://localhost:9000/models/gemini-test:generateContent");
    }

    #[test]
    fn test_parse_text_response() {
        let resp = parse(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello "}, {"text": "there"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5}
        }))
        .unwrap();

        assert_eq!(resp.content.as_deref(), Some("Hello there"));
        assert!(!resp.has_tool_calls());
        assert_eq!(resp.finish_reason, "STOP");
        assert_eq!(resp.usage.total_tokens, 5);
    }

    #[test]
    fn test_parse_function_calls_keeps_raw_content() {
        let content = json!({
            "role": "model",
            "parts": [
                {"functionCall": {"name": "get_current_weather", "args": {"location": "Tokyo"}}, "thoughtSignature": "abc"},
                {"functionCall": {"functionCall": {"name": "get_weather_forecast", "args": {"location": "Tokyo", "days": 2}}}}
            ]
        });
        let resp = parse(json!({"candidates": [{"content": content.clone()}]})).unwrap();

        assert_eq!(resp.tool_calls.len(), 2);
        assert_eq!(resp.tool_calls[0].name, "get_current_weather");
        assert_eq!(resp.tool_calls[1].name, "get_weather_forecast");
        assert_eq!(resp.tool_calls[1].arguments["days"], json!(2));
        assert!(resp.content.is_none());
        assert_eq!(resp.raw_content, Some(content));
    }

    #[test]
    fn test_parse_skips_thought_parts() {
        let resp = parse(json!({
            "candidates": [{"content": {"parts": [{"text": "thinking...", "thought": true}, {"text": "Answer"}]}}]
        }))
        .unwrap();
        assert_eq!(resp.content.as_deref(), Some("Answer"));
    }

    #[test]
    fn test_parse_missing_content() {
        let resp = parse(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        assert!(resp.content.is_none());
        assert!(!resp.has_tool_calls());
        assert_eq!(resp.raw_content, Some(json!({"role": "model", "parts": []})));
    }

    #[test]
    fn test_parse_blocked_prompt_is_empty_answer() {
        let resp = parse(json!({
            "promptFeedback": {"blockReason": "SAFETY"},
            "usageMetadata": {"promptTokenCount": 7, "totalTokenCount": 7}
        }))
        .unwrap();
        assert!(resp.content.is_none());
        assert!(!resp.has_tool_calls());
        assert_eq!(resp.usage.prompt_tokens, 7);

        let resp = parse(json!({"candidates": []})).unwrap();
        assert!(resp.content.is_none());
        assert!(!resp.has_tool_calls());
    }

    #[test]
    fn test_convert_messages_roles() {
        let raw = json!({"role": "model", "parts": [{"functionCall": {"name": "x", "args": {}}}]});
        let messages = vec![
            Message::user("weather?"),
            Message::model_with_tools(
                "",
                vec![ToolCallRequest { name: "x".to_string(), arguments: json!({}) }],
                Some(raw.clone()),
            ),
            Message::tool_results(vec![
                ToolResult { name: "x".to_string(), outcome: ToolOutcome::Result(json!(1)) },
                ToolResult { name: "y".to_string(), outcome: ToolOutcome::Error("bad".to_string()) },
            ]),
        ];

        let contents = client().convert_messages(&messages);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0], json!({"role": "user", "parts": [{"text": "weather?"}]}));
        assert_eq!(contents[1], raw);
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["functionResponse"]["response"], json!({"result": 1}));
        assert_eq!(contents[2]["parts"][1]["functionResponse"]["name"], "y");
        assert_eq!(contents[2]["parts"][1]["functionResponse"]["response"], json!({"error": "bad"}));
    }

    #[test]
    fn test_convert_model_message_without_raw() {
        let msg = Message::model_with_tools(
            "",
            vec![ToolCallRequest { name: "x".to_string(), arguments: json!({"a": 1}) }],
            None,
        );
        let contents = client().convert_messages(&[msg]);
        assert_eq!(
            contents[0],
            json!({"role": "model", "parts": [{"functionCall": {"name": "x", "args": {"a": 1}}}]})
        );
    }

    #[test]
    fn test_build_request_system_and_tools() {
        let tools = vec![ToolDefinition {
            name: "get_current_weather".to_string(),
            description: "Weather".to_string(),
            parameters: json!({"type": "object"}),
        }];
        let request = client().build_request(Some("Be brief."), &[Message::user("hi")], &tools);

        assert_eq!(request["systemInstruction"]["parts"][0]["text"], "Be brief.");
        assert_eq!(
            request["tools"][0]["functionDeclarations"][0]["name"],
            "get_current_weather"
        );

        let bare = client().build_request(None, &[Message::user("hi")], &[]);
        assert!(bare.get("tools").is_none());
        assert!(bare.get("systemInstruction").is_none());
    }
}
