//! Tool registry - holds tools, declares them and executes them

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::Error;

use super::Tool;

/// Tool definition for LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Outcome of one tool call, as fed back to the model.
///
/// Serializes as `{"result": ...}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOutcome {
    Result(Value),
    Error(String),
}

impl ToolOutcome {
    /// Error outcome carrying the tool's own message.
    ///
    /// `Error::Tool` is unwrapped so the model sees the message without the
    /// `Tool error:` prefix; other variants keep their display text.
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::Tool(message) => ToolOutcome::Error(message.clone()),
            other => ToolOutcome::Error(other.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutcome::Error(_))
    }

    /// JSON payload sent as the function response body.
    pub fn to_value(&self) -> Value {
        match self {
            ToolOutcome::Result(v) => serde_json::json!({ "result": v }),
            ToolOutcome::Error(e) => serde_json::json!({ "error": e }),
        }
    }
}

/// Registry of named tools.
///
/// Tools are kept sorted by name so declarations are stable between calls.
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a registry from a set of tools. On a name clash the last one wins.
    pub fn new(tools: Vec<Box<dyn Tool>>) -> Self {
        let mut registry = Self::empty();
        for tool in tools {
            registry.insert(tool);
        }
        info!(tools = ?registry.tool_names(), "Tool registry initialized");
        registry
    }

    /// Registry without tools (planner, router).
    pub fn empty() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.insert(Box::new(tool));
    }

    fn insert(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Duplicate tool name, replacing earlier registration");
        }
    }

    /// Get tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool by name.
    ///
    /// Never fails: unknown names, tool errors and panics all come back as
    /// [`ToolOutcome::Error`].
    pub async fn execute(&self, name: &str, params: Value) -> ToolOutcome {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, "Unknown tool requested");
            return ToolOutcome::Error(format!("Unknown tool: {name}"));
        };

        match AssertUnwindSafe(tool.execute(params)).catch_unwind().await {
            Ok(Ok(result)) => {
                debug!(tool = %name, "Tool executed successfully");
                ToolOutcome::Result(result)
            }
            Ok(Err(e)) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                ToolOutcome::from_error(&e)
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(tool = %name, panic = %message, "Tool panicked");
                ToolOutcome::Error(format!("Tool panicked: {message}"))
            }
        }
    }

    /// Check if a tool exists
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List registered tool names
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{DummyTool, FailingTool};
    use async_trait::async_trait;
    use serde_json::json;

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str { "boom" }
        fn description(&self) -> &str { "Panics" }
        fn parameters(&self) -> Value { json!({"type": "object"}) }

        async fn execute(&self, _params: Value) -> crate::Result<Value> {
            panic!("kaboom")
        }
    }

    fn dummy(name: &str, result: Value) -> Box<dyn Tool> {
        Box::new(DummyTool {
            name: name.to_string(),
            result,
        })
    }

    #[tokio::test]
    async fn test_registry_register_and_execute() {
        let registry = ToolRegistry::new(vec![dummy("test_tool", json!({"ok": true}))]);

        assert!(registry.has("test_tool"));

        let outcome = registry.execute("test_tool", json!({})).await;
        assert_eq!(outcome, ToolOutcome::Result(json!({"ok": true})));
    }

    #[tokio::test]
    async fn test_registry_unknown_tool() {
        let registry = ToolRegistry::empty();
        let outcome = registry.execute("nope", json!({})).await;
        assert_eq!(outcome, ToolOutcome::Error("Unknown tool: nope".to_string()));
    }

    #[tokio::test]
    async fn test_registry_tool_error_is_enveloped() {
        let registry = ToolRegistry::new(vec![Box::new(FailingTool {
            name: "flaky".to_string(),
            message: "service down".to_string(),
        })]);

        let outcome = registry.execute("flaky", json!({})).await;
        assert_eq!(outcome, ToolOutcome::Error("service down".to_string()));

        let payload = outcome.to_value();
        assert!(payload.get("error").is_some());
        assert!(payload.get("result").is_none());
    }

    #[tokio::test]
    async fn test_weather_tool_without_key_reports_bare_message() {
        let api = crate::tools::WeatherApi::new("", "http://127.0.0.1:9").unwrap();
        let registry = ToolRegistry::new(vec![Box::new(crate::tools::WeatherTool::new(api))]);

        let outcome = registry
            .execute("get_current_weather", json!({"location": "Tokyo"}))
            .await;
        assert_eq!(outcome.to_value(), json!({"error": "WEATHERAPI_KEY is not set."}));
    }

    #[test]
    fn test_outcome_from_error_variants() {
        assert_eq!(
            ToolOutcome::from_error(&Error::Tool("Invalid location".to_string())),
            ToolOutcome::Error("Invalid location".to_string())
        );
        assert_eq!(
            ToolOutcome::from_error(&Error::Other("boom".to_string())),
            ToolOutcome::Error("boom".to_string())
        );
        assert_eq!(
            ToolOutcome::from_error(&Error::Storage("disk full".to_string())),
            ToolOutcome::Error("Storage error: disk full".to_string())
        );
    }

    #[tokio::test]
    async fn test_registry_tool_panic_is_enveloped() {
        let registry = ToolRegistry::new(vec![Box::new(PanickingTool)]);
        let outcome = registry.execute("boom", json!({})).await;

        match outcome {
            ToolOutcome::Error(msg) => assert!(msg.contains("kaboom")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_registry_last_registration_wins() {
        let registry = ToolRegistry::new(vec![
            dummy("same", json!("first")),
            dummy("same", json!("second")),
        ]);

        assert_eq!(registry.len(), 1);
        let outcome = registry.execute("same", json!({})).await;
        assert_eq!(outcome, ToolOutcome::Result(json!("second")));
    }

    #[test]
    fn test_definitions_sorted_by_name() {
        let registry = ToolRegistry::new(vec![dummy("zeta", json!(1)), dummy("alpha", json!(2))]);
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(registry.definitions(), registry.definitions());
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let ok = serde_json::to_value(ToolOutcome::Result(json!({"t": 3}))).unwrap();
        assert_eq!(ok, json!({"result": {"t": 3}}));

        let err = serde_json::to_value(ToolOutcome::Error("bad".to_string())).unwrap();
        assert_eq!(err, json!({"error": "bad"}));
        assert_eq!(err, ToolOutcome::Error("bad".to_string()).to_value());
    }
}
