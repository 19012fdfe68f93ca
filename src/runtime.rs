//! Runtime composition: logging setup and runner wiring shared by the CLI
//! and the HTTP API.

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::agent::{
    AgentLoop, GeminiClient, LlmClient, MultiAgentCoordinator, RouterAgent, RouterCoordinator,
    Runner,
};
use crate::config::{AgentMode, Config};
use crate::error::Error;
use crate::persist::ensure_parent_dir;
use crate::tools::{ForecastTool, Tool, ToolRegistry, WeatherApi, WeatherTool};
use crate::{mailbox, memory, Result};

/// Install the global tracing subscriber, writing to `config.log_file`.
///
/// `RUST_LOG` takes precedence over `LOG_LEVEL`.
pub fn configure_logging(config: &Config) -> Result<()> {
    ensure_parent_dir(&config.log_file)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(&config.log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to install logger: {e}")))?;

    info!(file = %config.log_file.display(), level = %config.log_level, "Logging configured");
    Ok(())
}

/// Map a `LOG_LEVEL` value onto an `EnvFilter` directive.
fn level_directive(level: &str) -> &'static str {
    match level.trim().to_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        "OFF" => "off",
        _ => "info",
    }
}

/// The weather tools, sharing one HTTP client.
pub fn build_registry(config: &Config) -> Result<ToolRegistry> {
    let api = WeatherApi::new(&config.weatherapi_key, &config.weatherapi_base_url)?;
    Ok(ToolRegistry::new(vec![
        Box::new(WeatherTool::new(api.clone())) as Box<dyn Tool>,
        Box::new(ForecastTool::new(api)),
    ]))
}

/// Build the runner for the configured mode, backed by Gemini.
pub fn build_runner(config: &Config) -> Result<(Arc<dyn Runner>, AgentMode)> {
    let client: Arc<dyn LlmClient> = Arc::new(GeminiClient::new(&config.google_api_key, &config.model));
    build_runner_with(config, client)
}

/// Build the runner for the configured mode around an existing client.
pub fn build_runner_with(
    config: &Config,
    client: Arc<dyn LlmClient>,
) -> Result<(Arc<dyn Runner>, AgentMode)> {
    let mode = config.mode();
    info!(requested = %config.agent_mode, mode = %mode, "Building runner");

    let tools = Arc::new(build_registry(config)?);

    let runner: Arc<dyn Runner> = match mode {
        AgentMode::Single => Arc::new(single_agent(config, client, tools)?),
        AgentMode::Multi => Arc::new(multi_agent(config, client, tools)?),
        AgentMode::Router => {
            let direct = single_agent(config, client.clone(), tools.clone())?;
            let plan = multi_agent(config, client.clone(), tools)?;
            Arc::new(RouterCoordinator::new(
                RouterAgent::new(client),
                Arc::new(direct),
                Arc::new(plan),
            ))
        }
    };

    info!(mode = %mode, "Runner created");
    Ok((runner, mode))
}

fn single_agent(
    config: &Config,
    client: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
) -> Result<AgentLoop> {
    let memory = memory::open(&config.memory_file, config.memory_max_entries)?;
    Ok(AgentLoop::new(client, tools, config.max_turns).with_memory(Arc::from(memory)))
}

fn multi_agent(
    config: &Config,
    client: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
) -> Result<MultiAgentCoordinator> {
    let mailbox = mailbox::open(&config.mailbox_file)?;
    Ok(MultiAgentCoordinator::new(
        client,
        tools,
        Arc::from(mailbox),
        config.max_turns,
    ))
}
