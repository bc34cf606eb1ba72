//! Error Types

use std::time::Duration;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Missing or invalid configuration (credentials, endpoint, budgets)
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider or transport error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Provider answered with something we cannot interpret
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Tool not found in registry
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    /// Tool arguments did not match the declared parameters
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Iteration budget exhausted before the model produced an answer
    #[error("Agent exceeded maximum iterations ({max})")]
    IterationBudgetExceeded { max: usize },

    /// Wall-clock budget exhausted
    #[error("Agent exceeded timeout of {} seconds", .timeout.as_secs_f64())]
    TimeoutExceeded { timeout: Duration },

    /// Caller input rejected before anything was sent
    #[error("Invalid input: {0}")]
    InvalidInput(String),

}

/// Coarse failure category, stable enough to match on in callers and tests
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    InvalidInput,
    Transport,
    MalformedResponse,
    Tool,
    IterationBudget,
    Timeout,
}

impl AgentError {
    /// Category of this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Provider(_)
            | Self::ProviderUnavailable(_)
            | Self::RateLimited(_)
            | Self::Auth(_) => ErrorKind::Transport,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::ToolNotFound(_) | Self::ToolValidation(_) | Self::ToolExecution(_) => {
                ErrorKind::Tool
            }
            Self::IterationBudgetExceeded { .. } => ErrorKind::IterationBudget,
            Self::TimeoutExceeded { .. } => ErrorKind::Timeout,
        }
    }

    /// Whether a budget (iterations or wall clock) stopped the loop
    pub const fn is_budget_exhausted(&self) -> bool {
        matches!(
            self,
            Self::IterationBudgetExceeded { .. } | Self::TimeoutExceeded { .. }
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            Self::IterationBudgetExceeded { .. } => {
                "The request needed too many steps. Please try a simpler query.".into()
            }
            Self::TimeoutExceeded { .. } => {
                "The request took too long to process. Please try again.".into()
            }
            Self::InvalidInput(msg) => format!("Invalid input: {msg}"),
            _ => "I apologize, but I encountered an error while processing your request.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_errors_are_distinct_from_transport() {
        let iterations = AgentError::IterationBudgetExceeded { max: 3 };
        let timeout = AgentError::TimeoutExceeded {
            timeout: Duration::from_secs(30),
        };
        let transport = AgentError::Provider("connection reset".into());

        assert_eq!(iterations.kind(), ErrorKind::IterationBudget);
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert_eq!(transport.kind(), ErrorKind::Transport);
        assert!(iterations.is_budget_exhausted());
        assert!(timeout.is_budget_exhausted());
        assert!(!transport.is_budget_exhausted());
        assert!(iterations.to_string().contains("maximum iterations"));
        assert_eq!(timeout.to_string(), "Agent exceeded timeout of 30 seconds");
    }

    #[test]
    fn test_user_messages() {
        let rate = AgentError::RateLimited("slow down".into());
        assert_eq!(rate.kind(), ErrorKind::Transport);
        assert!(rate.user_message().contains("too many requests"));

        let tool = AgentError::ToolExecution("boom".into());
        assert_eq!(tool.kind(), ErrorKind::Tool);
        assert!(tool.user_message().starts_with("I apologize"));
    }

    #[test]
    fn test_tool_not_found_message() {
        let err = AgentError::ToolNotFound("teleport".into());
        assert_eq!(err.to_string(), "Tool 'teleport' not found");
    }
}
