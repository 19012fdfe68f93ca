//! Tools module - agent capabilities
//!
//! Tools are external actions the model may request, such as looking up the
//! current weather. The model only sees their declarations; execution always
//! happens locally through the [`ToolRegistry`].

mod registry;
pub mod weather;

pub use registry::{ToolDefinition, ToolOutcome, ToolRegistry};
pub use weather::{ForecastTool, WeatherApi, WeatherTool};

use async_trait::async_trait;
use serde_json::Value;
use crate::Result;

/// Tool trait - interface for all agent tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in function calls
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON Schema for parameters
    fn parameters(&self) -> Value;

    /// Execute the tool with the named arguments sent by the model
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Convert to tool definition for LLM
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

/// Dummy tool for testing
#[cfg(test)]
pub struct DummyTool {
    pub name: String,
    pub result: Value,
}

#[cfg(test)]
#[async_trait]
impl Tool for DummyTool {
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { "Dummy tool for testing" }
    fn parameters(&self) -> Value { serde_json::json!({"type": "object"}) }

    async fn execute(&self, _params: Value) -> Result<Value> {
        Ok(self.result.clone())
    }
}

/// Tool that always fails, for testing error isolation
#[cfg(test)]
pub struct FailingTool {
    pub name: String,
    pub message: String,
}

#[cfg(test)]
#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { "Always fails" }
    fn parameters(&self) -> Value { serde_json::json!({"type": "object"}) }

    async fn execute(&self, _params: Value) -> Result<Value> {
        Err(crate::Error::Tool(self.message.clone()))
    }
}
