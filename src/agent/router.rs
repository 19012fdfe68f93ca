//! Router - picks the direct or the plan/execute path for a prompt
//!
//! The router model is asked for strict JSON, but its output is parsed
//! tolerantly: a JSON object embedded in prose is accepted, and bare
//! keywords are a last resort. Anything unparseable routes to `plan`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::tools::ToolRegistry;
use crate::Result;

use super::llm::LlmClient;
use super::loop_impl::AgentLoop;
use super::Runner;

pub const ROUTER_SYSTEM_PROMPT: &str = "You are a router. Decide how to handle the user request. \
Return JSON only: {\"route\": \"direct\"|\"plan\", \"reason\": \"short explanation\"}. \
Use 'direct' for simple questions that do not need tools or multi-step planning. \
Use 'plan' when tools, external data, or multi-step reasoning are likely needed.";

const NO_REASON: &str = "No reason provided.";
const UNPARSEABLE_REASON: &str = "Fallback: unable to parse router response.";

/// Execution path for a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Single agent with tools and memory
    Direct,
    /// Planner/executor pair
    Plan,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Direct => "direct",
            Route::Plan => "plan",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A routing decision plus the model text it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDecision {
    pub route: Route,
    pub reason: String,
    pub raw: String,
}

/// Map a route name or alias to a [`Route`].
pub fn normalize_route(value: &str) -> Option<Route> {
    match value.trim().to_lowercase().as_str() {
        "direct" | "single" | "fast" => Some(Route::Direct),
        "plan" | "planner" | "multi" | "plan-execute" | "plan_execute" => Some(Route::Plan),
        _ => None,
    }
}

/// Substring from the first `{` to the last `}`, inclusive.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse router output into a decision, or `None` when nothing usable is found.
pub fn parse_router_response(text: &str) -> Option<RouteDecision> {
    let raw = text.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(Value::Object(data)) =
        extract_json(raw).and_then(|snippet| serde_json::from_str::<Value>(snippet).ok())
    {
        let route = match data.get("route") {
            Some(Value::String(s)) => normalize_route(s),
            Some(Value::Null) | None => None,
            Some(other) => normalize_route(&other.to_string()),
        };
        if let Some(route) = route {
            let reason = match data.get("reason") {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            return Some(RouteDecision {
                route,
                reason: if reason.is_empty() { NO_REASON.to_string() } else { reason },
                raw: raw.to_string(),
            });
        }
    }

    let lowered = raw.to_lowercase();
    if lowered.contains("direct") {
        return Some(RouteDecision {
            route: Route::Direct,
            reason: "Fallback: matched keyword 'direct'.".to_string(),
            raw: raw.to_string(),
        });
    }
    if ["plan", "planner", "multi"].iter().any(|k| lowered.contains(k)) {
        return Some(RouteDecision {
            route: Route::Plan,
            reason: "Fallback: matched keyword 'plan'.".to_string(),
            raw: raw.to_string(),
        });
    }

    None
}

/// LLM-backed router. Makes exactly one tool-less model call per decision.
pub struct RouterAgent {
    agent: AgentLoop,
}

impl RouterAgent {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        let agent = AgentLoop::new(client, Arc::new(ToolRegistry::empty()), 1)
            .with_system_prompt(ROUTER_SYSTEM_PROMPT);
        Self { agent }
    }

    /// Decide a route. Unparseable output falls back to [`Route::Plan`].
    pub async fn decide(&self, prompt: &str) -> Result<RouteDecision> {
        let raw = self
            .agent
            .run(&format!("User request:\n{prompt}\n\nReturn routing JSON only."))
            .await?;

        let decision = parse_router_response(&raw).unwrap_or_else(|| {
            warn!(raw = %raw, "Router response not understood, defaulting to plan");
            RouteDecision {
                route: Route::Plan,
                reason: UNPARSEABLE_REASON.to_string(),
                raw,
            }
        });

        info!(route = %decision.route, reason = %decision.reason, "Router decision");
        Ok(decision)
    }
}

/// Routes each prompt, then hands it to the chosen runner unchanged.
pub struct RouterCoordinator {
    router: RouterAgent,
    direct: Arc<dyn Runner>,
    plan: Arc<dyn Runner>,
}

impl RouterCoordinator {
    pub fn new(router: RouterAgent, direct: Arc<dyn Runner>, plan: Arc<dyn Runner>) -> Self {
        Self {
            router,
            direct,
            plan,
        }
    }

    #[instrument(skip_all)]
    pub async fn run(&self, prompt: &str) -> Result<String> {
        let decision = self.router.decide(prompt).await?;

        match decision.route {
            Route::Direct => {
                info!("Routing to direct agent");
                self.direct.run(prompt).await
            }
            Route::Plan => {
                info!("Routing to plan-execute coordinator");
                self.plan.run(prompt).await
            }
        }
    }
}

#[async_trait]
impl Runner for RouterCoordinator {
    async fn run(&self, prompt: &str) -> Result<String> {
        RouterCoordinator::run(self, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::FakeLlmClient;
    use std::sync::Mutex;

    #[test]
    fn test_parse_json_route() {
        let d = parse_router_response(r#"{"route": "direct", "reason": "simple"}"#).unwrap();
        assert_eq!(d.route, Route::Direct);
        assert_eq!(d.reason, "simple");
    }

    #[test]
    fn test_parse_alias_route() {
        let d = parse_router_response(r#"{"route": "multi", "reason": "needs tools"}"#).unwrap();
        assert_eq!(d.route, Route::Plan);
        assert_eq!(d.reason, "needs tools");
    }

    #[test]
    fn test_parse_keyword_fallback() {
        let d = parse_router_response("I think this needs a plan with tools.").unwrap();
        assert_eq!(d.route, Route::Plan);
        assert_eq!(d.reason, "Fallback: matched keyword 'plan'.");
    }

    #[test]
    fn test_parse_nothing_usable() {
        assert!(parse_router_response("no keywords here").is_none());
        assert!(parse_router_response("").is_none());
        assert!(parse_router_response("   ").is_none());
    }

    #[test]
    fn test_parse_json_in_fences_and_missing_reason() {
        let text = "```json\n{\"route\": \" FAST \", \"reason\": \"  \"}\n```";
        let d = parse_router_response(text).unwrap();
        assert_eq!(d.route, Route::Direct);
        assert_eq!(d.reason, NO_REASON);
        assert_eq!(d.raw, text);
    }

    #[test]
    fn test_unknown_json_route_uses_keywords() {
        let d = parse_router_response(r#"{"route": "maybe", "reason": "go direct"}"#).unwrap();
        assert_eq!(d.route, Route::Direct);
        assert_eq!(d.reason, "Fallback: matched keyword 'direct'.");
    }

    #[test]
    fn test_direct_keyword_checked_first() {
        let d = parse_router_response("direct, no plan needed").unwrap();
        assert_eq!(d.route, Route::Direct);
    }

    #[test]
    fn test_normalize_and_extract() {
        assert_eq!(normalize_route("Plan_Execute"), Some(Route::Plan));
        assert_eq!(normalize_route("single"), Some(Route::Direct));
        assert_eq!(normalize_route("other"), None);
        assert_eq!(extract_json("x {\"a\": {}} y"), Some("{\"a\": {}}"));
        assert_eq!(extract_json("} backwards {"), None);
        assert_eq!(extract_json("none"), None);
    }

    #[tokio::test]
    async fn test_decide_single_call_without_tools() {
        let client = Arc::new(FakeLlmClient::new(vec![r#"{"route": "direct", "reason": "chat"}"#]));
        let router = RouterAgent::new(client.clone());

        let decision = router.decide("hello").await.unwrap();
        assert_eq!(decision.route, Route::Direct);
        assert_eq!(client.call_count(), 1);

        let request = &client.requests()[0];
        assert!(request.tool_names.is_empty());
        assert_eq!(request.system.as_deref(), Some(ROUTER_SYSTEM_PROMPT));
        assert_eq!(
            request.messages[0].content,
            "User request:\nhello\n\nReturn routing JSON only."
        );
    }

    #[tokio::test]
    async fn test_decide_defaults_to_plan() {
        let client = Arc::new(FakeLlmClient::new(vec!["no idea"]));
        let decision = RouterAgent::new(client).decide("hello").await.unwrap();

        assert_eq!(decision.route, Route::Plan);
        assert_eq!(decision.reason, UNPARSEABLE_REASON);
        assert_eq!(decision.raw, "no idea");
    }

    struct Recording {
        label: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    impl Recording {
        fn new(label: &'static str) -> Arc<Self> {
            Arc::new(Self {
                label,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Runner for Recording {
        async fn run(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(format!("{} answered", self.label))
        }
    }

    #[tokio::test]
    async fn test_coordinator_dispatch() {
        for (router_text, expected) in [
            (r#"{"route": "direct", "reason": "easy"}"#, "direct answered"),
            (r#"{"route": "plan", "reason": "tools"}"#, "plan answered"),
            ("garbage", "plan answered"),
        ] {
            let direct = Recording::new("direct");
            let plan = Recording::new("plan");
            let coordinator = RouterCoordinator::new(
                RouterAgent::new(Arc::new(FakeLlmClient::new(vec![router_text]))),
                direct.clone(),
                plan.clone(),
            );

            assert_eq!(coordinator.run("weather?").await.unwrap(), expected);

            let called = if expected.starts_with("direct") { &direct } else { &plan };
            let skipped = if expected.starts_with("direct") { &plan } else { &direct };
            assert_eq!(*called.prompts.lock().unwrap(), vec!["weather?".to_string()]);
            assert!(skipped.prompts.lock().unwrap().is_empty());
        }
    }

    #[test]
    fn test_route_serde() {
        assert_eq!(serde_json::to_string(&Route::Plan).unwrap(), "\"plan\"");
        assert_eq!(Route::Direct.to_string(), "direct");
    }
}
