//! # agent-runtime
//!
//! Runtime providers and environment settings for the agent.
//!
//! ## Providers
//!
//! - **OpenRouter** (default): any model behind OpenRouter's OpenAI-compatible API
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{OpenRouterProvider, Settings};
//!
//! let settings = Settings::from_env()?;
//! let provider = OpenRouterProvider::new(settings.openrouter_config())?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .config(settings.agent_config())
//!     .build()?;
//! ```

pub mod openrouter;
pub mod settings;

pub use openrouter::{OpenRouterConfig, OpenRouterProvider};
pub use settings::{Settings, validate_api_key};

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentBuilder, AgentConfig, AgentError, AgentResponse, LlmProvider, Message, Result,
    Role, Tool, ToolRegistry,
};
