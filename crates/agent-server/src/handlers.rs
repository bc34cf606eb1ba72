//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use agent_core::{AgentResponse, Message};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider: String,
    pub provider_connected: bool,
    pub tools: usize,
    pub conversations: usize,
}

#[derive(Debug, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub conversation_id: String,
    #[serde(flatten)]
    pub response: AgentResponse,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub conversation_id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub conversation_id: String,
    pub reset: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub conversation_id: String,
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn not_found(id: &str) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        format!("Conversation '{id}' not found"),
        "CONVERSATION_NOT_FOUND",
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider: state.provider.name().to_string(),
        provider_connected,
        tools: state.tools.len(),
        conversations: state.conversation_count().await,
    })
}

/// Descriptors of every registered tool
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolInfo>> {
    Json(
        state
            .tools
            .descriptors()
            .into_iter()
            .map(|schema| ToolInfo {
                parameters: schema.parameters_json_schema(),
                name: schema.name,
                description: schema.description,
            })
            .collect(),
    )
}

/// Main chat endpoint
///
/// Agent failures (budgets, provider errors) still answer 200 with
/// `success: false`; only requests the agent never sees are rejected.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Message must not be empty",
            "INVALID_INPUT",
        ));
    }

    let conversation_id = payload
        .conversation_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let conversation = state
        .conversation_or_create(&conversation_id)
        .await
        .map_err(|e| {
            tracing::error!("Agent creation failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, e.user_message(), "AGENT_ERROR")
        })?;

    let response = conversation.lock().await.chat(&payload.message).await;
    if let Some(error) = &response.error {
        tracing::warn!(conversation_id = %conversation_id, error = %error, "Chat turn failed");
    }

    Ok(Json(ChatResponse {
        conversation_id,
        response,
    }))
}

/// History snapshot of one conversation
pub async fn conversation_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let conversation = state.conversation(&id).await.ok_or_else(|| not_found(&id))?;
    let messages = conversation.lock().await.history();

    Ok(Json(HistoryResponse {
        conversation_id: id,
        messages,
    }))
}

/// Clear one conversation's history
pub async fn reset_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    let conversation = state.conversation(&id).await.ok_or_else(|| not_found(&id))?;
    conversation.lock().await.reset();

    Ok(Json(ResetResponse {
        conversation_id: id,
        reset: true,
    }))
}

/// Drop a conversation and its agent
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.remove_conversation(&id).await {
        return Err(not_found(&id));
    }

    Ok(Json(DeleteResponse {
        conversation_id: id,
        deleted: true,
    }))
}
