//! CLI command handlers.

pub mod chat;
pub mod config;
pub mod demo;

use std::sync::Arc;

use anyhow::{Context, Result};

use agent_core::{Agent, AgentBuilder, AgentResponse, ToolRegistry};
use agent_runtime::{OpenRouterProvider, Settings};

/// Agent wired to OpenRouter with the built-in tools
pub fn build_agent(settings: &Settings) -> Result<Agent> {
    let provider = OpenRouterProvider::new(settings.openrouter_config())
        .context("Set OPENROUTER_API_KEY in your environment or .env file")?;

    let agent = AgentBuilder::new()
        .provider(Arc::new(provider))
        .tools(Arc::new(ToolRegistry::with_defaults()))
        .config(settings.agent_config())
        .build()?;
    tracing::debug!(model = %settings.model_name, "Agent ready");
    Ok(agent)
}

/// Render one turn's outcome for the terminal
pub fn render_response(response: &AgentResponse) -> String {
    let mut out = format!("🤖 Assistant: {}", response.content);

    if !response.tool_calls_made.is_empty() {
        let names: Vec<&str> = response
            .tool_calls_made
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        out.push_str(&format!("\n🔧 Tools used: {}", names.join(", ")));
    }
    out.push_str(&format!("\n🔄 Iterations: {}", response.iterations));

    if let Some(error) = &response.error {
        out.push_str(&format!("\n❌ Error: {error}"));
    }
    out
}

/// Cut `text` to at most `max` characters, marking the cut with "..."
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::ToolCall;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 100), "short");
        let long = "x".repeat(150);
        let cut = truncate(&long, 100);
        assert_eq!(cut.len(), 103);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn test_render_response() {
        let response = AgentResponse {
            content: "25 * 4 = 100".into(),
            tool_calls_made: vec![ToolCall::new("c1", "calculator", serde_json::Value::Null)],
            iterations: 2,
            success: true,
            error: None,
            error_kind: None,
        };
        let text = render_response(&response);
        assert!(text.contains("25 * 4 = 100"));
        assert!(text.contains("Tools used: calculator"));
        assert!(text.contains("Iterations: 2"));
        assert!(!text.contains("Error"));
    }
}
