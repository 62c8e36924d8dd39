use axum::{
    extract::{Path, State},
    Json,
};
use petmind_core::memory::{render_transcript, ChatHistoryStore, ChatMessage, ChatRole};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{ApiError, ErrorBody};
use super::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatHistoryResponse {
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<ChatMessage>,
    /// `Human: …` / `Agent: …` lines, oldest first
    pub transcript: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AppendMessageRequest {
    /// `human` or `agent`
    pub role: String,
    pub content: String,
}

/// Load a user's chat history
#[utoipa::path(
    get,
    path = "/api/v1/chat/{user_id}",
    tag = "chat",
    params(("user_id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Messages oldest first", body = ChatHistoryResponse),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ChatHistoryResponse>, ApiError> {
    let messages = state.chat.load(&user_id).await?;
    Ok(Json(ChatHistoryResponse {
        transcript: render_transcript(&messages),
        messages,
    }))
}

/// Append one message to a user's chat history
#[utoipa::path(
    post,
    path = "/api/v1/chat/{user_id}",
    tag = "chat",
    params(("user_id" = String, Path, description = "User identifier")),
    request_body = AppendMessageRequest,
    responses(
        (status = 200, description = "Stored message"),
        (status = 400, description = "Unknown role or blank user", body = ErrorBody)
    )
)]
pub async fn append_message(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<AppendMessageRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    let role = ChatRole::parse(&req.role)
        .ok_or_else(|| ApiError::bad_request(format!("unknown role '{}'", req.role)))?;
    let message = state.chat.append(&user_id, role, &req.content).await?;
    Ok(Json(message))
}
