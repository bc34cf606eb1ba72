//! # agent-core
//!
//! Core agent logic: a bounded tool-calling conversation loop over a
//! provider-agnostic chat-completion abstraction.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │    Tools    │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────┘  │
//! │  ┌─────────────────────────────┐                             │
//! │  │   Conversation History      │                             │
//! │  └─────────────────────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The per-call transcript (including every tool round-trip) lives only for
//! the duration of one `chat` call; the history keeps just the user message
//! and final answer of each completed turn.

pub mod builtin;
pub mod error;
pub mod history;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod tool;

pub use error::{AgentError, ErrorKind, Result};
pub use history::ConversationHistory;
pub use message::{Message, Role, ToolCall};
pub use provider::{Attribution, Completion, GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, AgentResponse};
pub use tool::{ParameterSchema, Tool, ToolArguments, ToolOutcome, ToolRegistry, ToolResult, ToolSchema};
