//! Agent loop - the bounded tool-calling conversation

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::memory::MemoryStore;
use crate::tools::ToolRegistry;
use crate::Result;

use super::context::{build_messages, preview};
use super::llm::LlmClient;
use super::message::{Message, ToolResult};
use super::Runner;

/// Returned for blank prompts; the model is not called.
pub const EMPTY_PROMPT_REPLY: &str = "Prompt is empty. Please provide a question.";

/// Returned when the model is still requesting tools after `max_turns`.
pub const TURN_LIMIT_REPLY: &str = "Stopped after too many tool-call turns.";

/// The agent loop sends a prompt to the model, runs the tools it asks for,
/// feeds the results back and stops at the first plain-text answer.
pub struct AgentLoop {
    client: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    system_prompt: Option<String>,
    memory: Option<Arc<dyn MemoryStore>>,
    max_turns: usize,
}

impl AgentLoop {
    /// Create a new agent loop. `max_turns` is at least 1.
    pub fn new(client: Arc<dyn LlmClient>, tools: Arc<ToolRegistry>, max_turns: usize) -> Self {
        Self {
            client,
            tools,
            system_prompt: None,
            memory: None,
            max_turns: max_turns.max(1),
        }
    }

    /// Instruction passed alongside the conversation on every call.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Recall recent interactions before the prompt and record each answer.
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Run the agent loop for a single prompt.
    ///
    /// Tool failures are fed back to the model; only model-call errors
    /// are returned as `Err`.
    #[instrument(skip_all, fields(model = %self.client.default_model(), max_turns = self.max_turns))]
    pub async fn run(&self, prompt: &str) -> Result<String> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            warn!("Empty prompt received; returning guidance message");
            return Ok(EMPTY_PROMPT_REPLY.to_string());
        }

        info!(prompt = %preview(prompt), "Agent run started");

        let tools = self.tools.definitions();
        let mut messages = build_messages(self.memory.as_deref(), prompt);

        for turn in 1..=self.max_turns {
            info!(turn, max_turns = self.max_turns, "LLM turn");

            let response = self
                .client
                .chat(self.system_prompt.as_deref(), &messages, &tools)
                .await?;

            if !response.has_tool_calls() {
                let content = response.content.unwrap_or_default();
                info!(chars = content.len(), preview = %preview(&content), "LLM final response received");
                self.remember(prompt, &content);
                return Ok(content);
            }

            let call_count = response.tool_calls.len();
            info!(tool_calls = call_count, "LLM requested tool calls");

            let mut results = Vec::with_capacity(call_count);
            for (index, call) in response.tool_calls.iter().enumerate() {
                info!(
                    index = index + 1,
                    of = call_count,
                    tool = %call.name,
                    args = %call.arguments,
                    "Executing tool call"
                );
                let outcome = self.tools.execute(&call.name, call.arguments.clone()).await;
                info!(tool = %call.name, error = outcome.is_error(), "Tool finished");
                results.push(ToolResult {
                    name: call.name.clone(),
                    outcome,
                });
            }

            messages.push(Message::model_with_tools(
                response.content.unwrap_or_default(),
                response.tool_calls,
                response.raw_content,
            ));
            messages.push(Message::tool_results(results));
            debug!(messages = messages.len(), "Conversation extended");
        }

        warn!(max_turns = self.max_turns, "Turn limit reached while tools were still requested");
        self.remember(prompt, TURN_LIMIT_REPLY);
        Ok(TURN_LIMIT_REPLY.to_string())
    }

    fn remember(&self, prompt: &str, response: &str) {
        if let Some(memory) = &self.memory {
            if let Err(e) = memory.add_interaction(prompt, response) {
                warn!(error = %e, "Failed to record interaction in memory");
            }
        }
    }
}

#[async_trait]
impl Runner for AgentLoop {
    async fn run(&self, prompt: &str) -> Result<String> {
        AgentLoop::run(self, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::{FakeLlmClient, LlmResponse};
    use crate::agent::message::{Role, ToolCallRequest};
    use crate::memory::InMemoryStore;
    use crate::tools::{DummyTool, FailingTool, Tool, ToolOutcome};
    use serde_json::json;

    fn weather_tools() -> Arc<ToolRegistry> {
        Arc::new(ToolRegistry::new(vec![
            Box::new(DummyTool {
                name: "get_current_weather".to_string(),
                result: json!({"temperature_c": 21}),
            }) as Box<dyn Tool>,
            Box::new(FailingTool {
                name: "get_weather_forecast".to_string(),
                message: "WEATHERAPI_KEY is not set.".to_string(),
            }),
        ]))
    }

    #[tokio::test]
    async fn test_agent_loop_simple() {
        let client = Arc::new(FakeLlmClient::new(vec!["Hello, human!"]));
        let agent = AgentLoop::new(client.clone(), Arc::new(ToolRegistry::empty()), 5);

        let response = agent.run("Hi there").await.unwrap();

        assert_eq!(response, "Hello, human!");
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_prompt_skips_model() {
        let client = Arc::new(FakeLlmClient::new(vec![]));
        let agent = AgentLoop::new(client.clone(), weather_tools(), 5);

        assert_eq!(agent.run("").await.unwrap(), EMPTY_PROMPT_REPLY);
        assert_eq!(agent.run("   \n\t ").await.unwrap(), EMPTY_PROMPT_REPLY);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_agent_loop_with_tool() {
        let client = Arc::new(FakeLlmClient::with_tool_call(
            "get_current_weather",
            json!({"location": "Tokyo"}),
            "It is 21C in Tokyo.",
        ));
        let agent = AgentLoop::new(client.clone(), weather_tools(), 5);

        let response = agent.run("Weather in Tokyo?").await.unwrap();
        assert_eq!(response, "It is 21C in Tokyo.");
        assert_eq!(client.call_count(), 2);

        let second = &client.requests()[1];
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[1].role, Role::Model);
        assert_eq!(second.messages[1].tool_calls[0].name, "get_current_weather");
        assert_eq!(second.messages[2].role, Role::Tool);
        assert_eq!(
            second.messages[2].tool_results[0].outcome,
            ToolOutcome::Result(json!({"temperature_c": 21}))
        );
    }

    #[tokio::test]
    async fn test_all_calls_of_a_turn_in_one_message_in_order() {
        let client = Arc::new(FakeLlmClient::scripted(vec![
            LlmResponse::tool_calls(vec![
                ToolCallRequest { name: "get_weather_forecast".to_string(), arguments: json!({"location": "Oslo"}) },
                ToolCallRequest { name: "nope".to_string(), arguments: json!({}) },
                ToolCallRequest { name: "get_current_weather".to_string(), arguments: json!({"location": "Oslo"}) },
            ]),
            LlmResponse::text("done"),
        ]));
        let agent = AgentLoop::new(client.clone(), weather_tools(), 5);

        assert_eq!(agent.run("Oslo?").await.unwrap(), "done");

        let results = &client.requests()[1].messages[2].tool_results;
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["get_weather_forecast", "nope", "get_current_weather"]);
        assert_eq!(
            results[0].outcome,
            ToolOutcome::Error("WEATHERAPI_KEY is not set.".to_string())
        );
        assert_eq!(results[1].outcome, ToolOutcome::Error("Unknown tool: nope".to_string()));
        assert!(!results[2].outcome.is_error());
    }

    #[tokio::test]
    async fn test_turn_limit_makes_exactly_max_turns_calls() {
        for max_turns in [1, 3, 7] {
            let client = Arc::new(FakeLlmClient::looping_tool_call("get_current_weather"));
            let agent = AgentLoop::new(client.clone(), weather_tools(), max_turns);

            let response = agent.run("loop forever").await.unwrap();
            assert_eq!(response, TURN_LIMIT_REPLY);
            assert_eq!(client.call_count(), max_turns);
        }
    }

    #[tokio::test]
    async fn test_zero_max_turns_still_calls_once() {
        let client = Arc::new(FakeLlmClient::new(vec!["ok"]));
        let agent = AgentLoop::new(client.clone(), weather_tools(), 0);

        assert_eq!(agent.max_turns(), 1);
        assert_eq!(agent.run("hi").await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let client = Arc::new(FakeLlmClient::new(vec![]));
        let agent = AgentLoop::new(client, weather_tools(), 3);
        assert!(matches!(agent.run("hi").await, Err(crate::Error::Llm(_))));
    }

    #[tokio::test]
    async fn test_system_prompt_and_tools_sent() {
        let client = Arc::new(FakeLlmClient::new(vec!["ok"]));
        let agent = AgentLoop::new(client.clone(), weather_tools(), 2).with_system_prompt("Be brief.");

        agent.run("hi").await.unwrap();

        let request = &client.requests()[0];
        assert_eq!(request.system.as_deref(), Some("Be brief."));
        assert_eq!(request.tool_names, vec!["get_current_weather", "get_weather_forecast"]);
        assert_eq!(request.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_recalled_and_recorded() {
        let memory = Arc::new(InMemoryStore::new(5));
        memory.add_interaction("weather in Berlin", "12C").unwrap();

        let client = Arc::new(FakeLlmClient::new(vec!["15C in Paris"]));
        let agent = AgentLoop::new(client.clone(), weather_tools(), 2).with_memory(memory.clone());

        assert_eq!(agent.run("  and Paris?  ").await.unwrap(), "15C in Paris");

        let request = &client.requests()[0];
        assert_eq!(request.messages.len(), 2);
        assert!(request.messages[0].content.contains("User: weather in Berlin"));
        assert_eq!(request.messages[1].content, "and Paris?");

        let entries = memory.recent().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].prompt, "and Paris?");
        assert_eq!(entries[1].response, "15C in Paris");
    }

    #[tokio::test]
    async fn test_turn_limit_is_remembered() {
        let memory = Arc::new(InMemoryStore::new(5));
        let client = Arc::new(FakeLlmClient::looping_tool_call("get_current_weather"));
        let agent = AgentLoop::new(client, weather_tools(), 2).with_memory(memory.clone());

        agent.run("spin").await.unwrap();
        assert_eq!(memory.recent().unwrap()[0].response, TURN_LIMIT_REPLY);
    }

    #[tokio::test]
    async fn test_missing_text_is_empty_answer() {
        let mut response = LlmResponse::text("");
        response.content = None;
        let client = Arc::new(FakeLlmClient::scripted(vec![response]));
        let agent = AgentLoop::new(client, weather_tools(), 2);

        assert_eq!(agent.run("hi").await.unwrap(), "");
    }
}
