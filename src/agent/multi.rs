//! Planner / executor coordination over the mailbox

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::mailbox::{content, Mailbox};
use crate::tools::ToolRegistry;
use crate::Result;

use super::context::preview;
use super::llm::LlmClient;
use super::loop_impl::AgentLoop;
use super::Runner;

pub const PLANNER_SYSTEM_PROMPT: &str =
    "You are a planner. Produce a short, numbered plan for the executor. Do not call tools.";

pub const EXECUTOR_SYSTEM_PROMPT: &str =
    "You are an executor. Follow the plan, call tools when needed, and return results.";

/// Runs planner -> executor -> planner for each prompt.
///
/// The planner never sees tools. Every hand-off is appended to the mailbox
/// under a fresh thread id, so one run leaves exactly four records:
/// `user -> planner`, `planner -> executor`, `executor -> planner`,
/// `planner -> user`.
pub struct MultiAgentCoordinator {
    planner: AgentLoop,
    executor: AgentLoop,
    mailbox: Arc<dyn Mailbox>,
    last_thread: Mutex<Option<String>>,
}

impl MultiAgentCoordinator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        executor_tools: Arc<ToolRegistry>,
        mailbox: Arc<dyn Mailbox>,
        max_turns: usize,
    ) -> Self {
        let planner = AgentLoop::new(client.clone(), Arc::new(ToolRegistry::empty()), max_turns)
            .with_system_prompt(PLANNER_SYSTEM_PROMPT);
        let executor = AgentLoop::new(client, executor_tools, max_turns)
            .with_system_prompt(EXECUTOR_SYSTEM_PROMPT);

        Self {
            planner,
            executor,
            mailbox,
            last_thread: Mutex::new(None),
        }
    }

    /// Thread id of the most recent run, if any.
    pub fn last_thread_id(&self) -> Option<String> {
        self.last_thread.lock().ok().and_then(|t| t.clone())
    }

    #[instrument(skip_all)]
    pub async fn run(&self, prompt: &str) -> Result<String> {
        let thread_id = Uuid::new_v4().to_string();
        *self.last_thread.lock()? = Some(thread_id.clone());
        info!(thread = %thread_id, prompt = %preview(prompt), "Multi-agent run started");

        self.mailbox
            .send("user", "planner", content([("prompt", prompt)]), &thread_id)?;

        let plan = self
            .planner
            .run(&format!(
                "User request:\n{prompt}\n\nReturn a short numbered plan for the executor."
            ))
            .await?;
        info!(thread = %thread_id, chars = plan.len(), "Planner produced plan");
        self.mailbox.send(
            "planner",
            "executor",
            content([("plan", plan.as_str()), ("prompt", prompt)]),
            &thread_id,
        )?;

        let result = self
            .executor
            .run(&format!(
                "User request:\n{prompt}\n\nPlan:\n{plan}\n\nExecute the plan and provide results."
            ))
            .await?;
        info!(thread = %thread_id, chars = result.len(), "Executor produced result");
        self.mailbox
            .send("executor", "planner", content([("result", result.as_str())]), &thread_id)?;

        let final_response = self
            .planner
            .run(&format!(
                "User request:\n{prompt}\n\nExecutor result:\n{result}\n\nWrite the final response for the user."
            ))
            .await?;
        self.mailbox.send(
            "planner",
            "user",
            content([("final", final_response.as_str())]),
            &thread_id,
        )?;

        info!(
            thread = %thread_id,
            chars = final_response.len(),
            preview = %preview(&final_response),
            "Multi-agent run completed"
        );
        Ok(final_response)
    }
}

#[async_trait]
impl Runner for MultiAgentCoordinator {
    async fn run(&self, prompt: &str) -> Result<String> {
        MultiAgentCoordinator::run(self, prompt).await
    }
}
