//! Environment Settings
//!
//! Everything the binaries need to build an agent, read from environment
//! variables (after `.env` has been loaded by the caller). Unset variables
//! fall back to defaults; set-but-unparsable ones are a configuration error.

use std::str::FromStr;
use std::time::Duration;

use agent_core::{
    AgentConfig,
    error::{AgentError, Result},
    provider::{Attribution, GenerationOptions},
    reasoning::{DEFAULT_HISTORY_WINDOW, DEFAULT_MAX_ITERATIONS},
};

use crate::openrouter::{DEFAULT_BASE_URL, OpenRouterConfig};

/// Placeholder value shipped in `.env.example`
pub const API_KEY_PLACEHOLDER: &str = "your_openrouter_api_key_here";

pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
pub const DEFAULT_SITE_NAME: &str = "AI Agent Template";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_MAX_CONVERSATIONS: usize = 1000;
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// True when `key` looks like a real credential
pub fn validate_api_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != API_KEY_PLACEHOLDER
}

/// Application settings
#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub base_url: String,
    pub site_url: String,
    pub site_name: String,
    pub model_name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_iterations: usize,
    pub timeout: Duration,
    pub history_window: usize,
    pub parallel_tool_calls: bool,
    pub debug: bool,
    pub log_level: String,
    pub bind_addr: String,
    pub max_conversations: usize,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("site_url", &self.site_url)
            .field("site_name", &self.site_name)
            .field("model_name", &self.model_name)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("max_iterations", &self.max_iterations)
            .field("timeout", &self.timeout)
            .field("history_window", &self.history_window)
            .field("parallel_tool_calls", &self.parallel_tool_calls)
            .field("debug", &self.debug)
            .field("log_level", &self.log_level)
            .field("bind_addr", &self.bind_addr)
            .field("max_conversations", &self.max_conversations)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        let generation = GenerationOptions::default();
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.into(),
            site_url: DEFAULT_SITE_URL.into(),
            site_name: DEFAULT_SITE_NAME.into(),
            model_name: generation.model,
            max_tokens: generation.max_tokens,
            temperature: generation.temperature,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            history_window: DEFAULT_HISTORY_WINDOW,
            parallel_tool_calls: false,
            debug: false,
            log_level: "INFO".into(),
            bind_addr: DEFAULT_BIND_ADDR.into(),
            max_conversations: DEFAULT_MAX_CONVERSATIONS,
        }
    }
}

impl Settings {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs: f64 = parse(&get, "TIMEOUT_SECONDS", defaults.timeout.as_secs_f64())?;
        let timeout = Duration::try_from_secs_f64(timeout_secs).map_err(|_| {
            AgentError::Config(format!("TIMEOUT_SECONDS must be a positive number, got {timeout_secs}"))
        })?;

        Ok(Self {
            api_key: get("OPENROUTER_API_KEY").unwrap_or_default(),
            base_url: get("OPENROUTER_BASE_URL").unwrap_or(defaults.base_url),
            site_url: get("SITE_URL").unwrap_or(defaults.site_url),
            site_name: get("SITE_NAME").unwrap_or(defaults.site_name),
            model_name: get("MODEL_NAME").unwrap_or(defaults.model_name),
            max_tokens: parse(&get, "MAX_TOKENS", defaults.max_tokens)?,
            temperature: parse(&get, "TEMPERATURE", defaults.temperature)?,
            max_iterations: parse(&get, "MAX_ITERATIONS", defaults.max_iterations)?,
            timeout,
            history_window: parse(&get, "HISTORY_WINDOW", defaults.history_window)?,
            parallel_tool_calls: parse_flag(&get, "PARALLEL_TOOL_CALLS", defaults.parallel_tool_calls)?,
            debug: parse_flag(&get, "DEBUG", defaults.debug)?,
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_conversations: parse(&get, "MAX_CONVERSATIONS", defaults.max_conversations)?,
        })
    }

    /// Whether the API key is usable
    pub fn has_valid_api_key(&self) -> bool {
        validate_api_key(&self.api_key)
    }

    /// Agent configuration derived from these settings
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_iterations: self.max_iterations,
            timeout: self.timeout,
            history_window: self.history_window,
            parallel_tool_calls: self.parallel_tool_calls,
            generation: GenerationOptions {
                model: self.model_name.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                attribution: Attribution {
                    referer: Some(self.site_url.clone()),
                    title: Some(self.site_name.clone()),
                },
            },
            ..AgentConfig::default()
        }
    }

    /// Provider configuration derived from these settings
    pub fn openrouter_config(&self) -> OpenRouterConfig {
        OpenRouterConfig::new(self.api_key.clone()).with_base_url(self.base_url.clone())
    }

    /// Directive for `tracing_subscriber::EnvFilter` when `RUST_LOG` is unset
    pub fn log_filter(&self) -> String {
        if self.debug {
            "debug".into()
        } else {
            self.log_level.to_lowercase()
        }
    }
}

fn parse<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse()
            .map_err(|e| AgentError::Config(format!("{key}: cannot parse '{raw}': {e}")))
    })
}

fn parse_flag<G>(get: &G, key: &str, default: bool) -> Result<bool>
where
    G: Fn(&str) -> Option<String>,
{
    get(key).map_or(Ok(default), |raw| match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AgentError::Config(format!("{key}: expected a boolean, got '{other}'"))),
    })
}
