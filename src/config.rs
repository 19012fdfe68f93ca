//! Configuration management
//!
//! Everything is read from the environment (a `.env` file is loaded first;
//! variables already set in the shell win). Missing values fall back to
//! defaults suitable for local runs.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How prompts are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// One tool-calling agent with memory
    Single,
    /// Planner/executor pair with a mailbox trace
    Multi,
    /// Router picking single or multi per prompt
    Router,
}

impl AgentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMode::Single => "single",
            AgentMode::Multi => "multi",
            AgentMode::Router => "router",
        }
    }

    /// Resolve a mode name; anything unknown becomes [`AgentMode::Multi`].
    pub fn resolve(raw: &str) -> Self {
        match raw.parse() {
            Ok(mode) => mode,
            Err(_) => {
                warn!(requested = raw, fallback = "multi", "Unknown AGENT_MODE");
                AgentMode::Multi
            }
        }
    }
}

impl FromStr for AgentMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(AgentMode::Single),
            "multi" => Ok(AgentMode::Multi),
            "router" => Ok(AgentMode::Router),
            other => Err(format!("unknown agent mode '{other}'")),
        }
    }
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gemini model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Gemini API key; never serialized
    #[serde(default, skip_serializing)]
    pub google_api_key: String,

    #[serde(default = "default_weather_url")]
    pub weatherapi_base_url: String,

    /// WeatherAPI key; never serialized
    #[serde(default, skip_serializing)]
    pub weatherapi_key: String,

    /// Level used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default = "default_memory_file")]
    pub memory_file: PathBuf,

    #[serde(default = "default_memory_max_entries")]
    pub memory_max_entries: usize,

    #[serde(default = "default_mailbox_file")]
    pub mailbox_file: PathBuf,

    /// Requested mode, as given; see [`Config::mode`]
    #[serde(default = "default_agent_mode")]
    pub agent_mode: String,

    /// Maximum tool-call turns per agent run
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    #[serde(default = "default_api_host")]
    pub api_host: String,

    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_weather_url() -> String {
    "https://api.weatherapi.com/v1".to_string()
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs/agent.log")
}

fn default_memory_file() -> PathBuf {
    PathBuf::from("data/memory.json")
}

fn default_memory_max_entries() -> usize {
    10
}

fn default_mailbox_file() -> PathBuf {
    PathBuf::from("data/mailbox.json")
}

fn default_agent_mode() -> String {
    "multi".to_string()
}

fn default_max_turns() -> usize {
    5
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            google_api_key: String::new(),
            weatherapi_base_url: default_weather_url(),
            weatherapi_key: String::new(),
            log_level: default_log_level(),
            log_file: default_log_file(),
            memory_file: default_memory_file(),
            memory_max_entries: default_memory_max_entries(),
            mailbox_file: default_mailbox_file(),
            agent_mode: default_agent_mode(),
            max_turns: default_max_turns(),
            api_host: default_api_host(),
            api_port: default_api_port(),
        }
    }
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    pub fn from_env() -> Self {
        // A missing .env file is normal.
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key -> value source.
    ///
    /// Empty values count as unset. Unparseable integers log a warning and
    /// keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            google_api_key: get("GOOGLE_API_KEY")
                .or_else(|| get("GEMINI_API_KEY"))
                .unwrap_or_default(),
            weatherapi_base_url: get("WEATHERAPI_BASE_URL").unwrap_or(defaults.weatherapi_base_url),
            weatherapi_key: get("WEATHERAPI_KEY").unwrap_or_default(),
            log_level: get("LOG_LEVEL")
                .map(|v| v.trim().to_uppercase())
                .unwrap_or(defaults.log_level),
            log_file: get("LOG_FILE").map(PathBuf::from).unwrap_or(defaults.log_file),
            memory_file: get("MEMORY_FILE").map(PathBuf::from).unwrap_or(defaults.memory_file),
            memory_max_entries: read_parsed("MEMORY_MAX_ENTRIES", get("MEMORY_MAX_ENTRIES"), defaults.memory_max_entries),
            mailbox_file: get("MAILBOX_FILE").map(PathBuf::from).unwrap_or(defaults.mailbox_file),
            agent_mode: get("AGENT_MODE")
                .map(|v| v.trim().to_lowercase())
                .unwrap_or(defaults.agent_mode),
            max_turns: read_parsed("MAX_TURNS", get("MAX_TURNS"), defaults.max_turns),
            api_host: get("API_HOST").unwrap_or(defaults.api_host),
            api_port: read_parsed("API_PORT", get("API_PORT"), defaults.api_port),
        };

        if config.google_api_key.is_empty() {
            warn!("GOOGLE_API_KEY is not set. Gemini calls will fail.");
        }
        if config.weatherapi_key.is_empty() {
            warn!("WEATHERAPI_KEY is not set. Weather tools will fail.");
        }

        debug!(
            model = %config.model,
            mode = %config.agent_mode,
            max_turns = config.max_turns,
            log_file = %config.log_file.display(),
            memory_file = %config.memory_file.display(),
            mailbox_file = %config.mailbox_file.display(),
            "Config loaded"
        );
        config
    }

    /// The resolved agent mode.
    pub fn mode(&self) -> AgentMode {
        AgentMode::resolve(&self.agent_mode)
    }
}

fn read_parsed<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(variable = name, value = %raw, default = %default, "Invalid integer, using default");
            default
        }
    }
}
