//! react-agent HTTP Server
//!
//! Axum-based server exposing the tool-calling agent over a REST API.
//! Every conversation id gets its own agent and history.

mod handlers;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{LlmProvider, ToolRegistry};
use agent_runtime::{OpenRouterProvider, Settings};

use crate::handlers::{
    chat_handler, conversation_history, delete_conversation, health_check, list_tools,
    reset_conversation,
};
use crate::state::AppState;

/// Build the router over the given state
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/tools", get(list_tools))
        // Agent API
        .route("/api/chat", post(chat_handler))
        .route("/api/conversations/{id}/history", get(conversation_history))
        .route("/api/conversations/{id}/reset", post(reset_conversation))
        .route("/api/conversations/{id}", delete(delete_conversation))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();
    let settings = Settings::from_env()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("{},tower_http=debug", settings.log_filter())),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize LLM provider
    let provider = Arc::new(
        OpenRouterProvider::new(settings.openrouter_config())
            .context("Set OPENROUTER_API_KEY in your environment or .env file")?,
    );

    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to OpenRouter at {}", settings.base_url),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ OpenRouter not reachable - chat requests will fail");
        }
    }

    // Initialize tools
    let tools = Arc::new(ToolRegistry::with_defaults());
    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    let config = settings.agent_config();
    config.validate()?;
    tracing::info!(
        model = %config.generation.model,
        max_iterations = config.max_iterations,
        timeout_secs = config.timeout.as_secs_f64(),
        history_window = config.history_window,
        "Agent configuration"
    );

    let state =
        AppState::new(provider, tools, config).with_max_conversations(settings.max_conversations);
    let app = app(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 react-agent server running on http://{}", settings.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                          - Health check");
    tracing::info!("  GET  /api/tools                       - List tools");
    tracing::info!("  POST /api/chat                        - Send message");
    tracing::info!("  GET  /api/conversations/:id/history   - Conversation history");
    tracing::info!("  POST /api/conversations/:id/reset     - Reset conversation");
    tracing::info!("  DELETE /api/conversations/:id         - Delete conversation");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
