//! Agent module - core agent logic.
//!
//! This module contains:
//! - Message types exchanged with the model
//! - LLM client trait and the Gemini implementation
//! - The single-agent loop
//! - The planner/executor coordinator and the router in front of it

mod context;
mod loop_impl;
mod message;
pub mod multi;
pub mod router;

// LLM providers in submodule
pub mod llm;

use async_trait::async_trait;

use crate::Result;

// Re-exports for convenience
pub use context::{build_messages, preview, MEMORY_CONTEXT_HEADER};
pub use llm::{GeminiClient, LlmClient, LlmResponse, Usage};
pub use loop_impl::{AgentLoop, EMPTY_PROMPT_REPLY, TURN_LIMIT_REPLY};
pub use message::{Message, Role, ToolCallRequest, ToolResult};
pub use multi::MultiAgentCoordinator;
pub use router::{parse_router_response, Route, RouteDecision, RouterAgent, RouterCoordinator};

/// Anything that turns a prompt into a final answer.
///
/// Implemented by [`AgentLoop`], [`MultiAgentCoordinator`] and
/// [`RouterCoordinator`], so the router and the HTTP layer can hold any of
/// them as `Arc<dyn Runner>`.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn run(&self, prompt: &str) -> Result<String>;
}
