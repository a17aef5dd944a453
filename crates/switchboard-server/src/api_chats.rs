//! Text chat endpoints.
//!
//! A chat session is a call with a text output medium: the platform assigns
//! it a call id, delivers the same lifecycle webhooks, and the session lives
//! in the calls table alongside voice calls. Only the creation payload and
//! the message-send channel differ.

use crate::{error_response, platform_err_to_response, with_conn, ApiError, AppState};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_calls::{create_call, get_call, list_calls, NewCall};

#[derive(Debug, Deserialize, Default)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct CreateChatResponse {
    pub chat_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// Returns 404 unless the chat session is known locally.
async fn require_chat(state: &AppState, chat_id: &str) -> Result<(), ApiError> {
    let chat_id = chat_id.to_string();
    let exists = with_conn(&state.pool, move |conn| {
        Ok(get_call(conn, &chat_id)?.is_some())
    })
    .await?;
    if exists {
        Ok(())
    } else {
        Err(error_response(
            StatusCode::NOT_FOUND,
            "Chat session not found",
        ))
    }
}

/// POST /chats
///
/// Creates a text chat session on the platform and records it as a call.
pub async fn create_chat_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateChatRequest>,
) -> Result<Json<CreateChatResponse>, ApiError> {
    tracing::info!(metadata = ?payload.metadata, "creating text chat session");

    let created = state
        .platform
        .create_text_chat(&payload.metadata)
        .await
        .map_err(platform_err_to_response)?;

    let new_call = NewCall {
        call_id: created.call_id.clone(),
        agent_id: state.platform.agent_id().to_string(),
        join_url: String::new(),
        metadata: Some(json!(payload.metadata)),
        raw_response: Some(created.raw),
    };
    with_conn(&state.pool, move |conn| create_call(conn, &new_call)).await?;

    Ok(Json(CreateChatResponse {
        chat_id: created.call_id,
        status: "created".to_string(),
        message: "Chat session created successfully".to_string(),
    }))
}

/// POST /chats/:chatId/messages
///
/// Forwards a user message into the session; the agent answers over the
/// platform's text medium (and the exchange surfaces in the transcript).
pub async fn send_chat_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<Value>, ApiError> {
    require_chat(&state, &chat_id).await?;

    let response = state
        .platform
        .send_data_message(&chat_id, &payload.message)
        .await
        .map_err(platform_err_to_response)?;

    tracing::info!(chat_id = %chat_id, "chat message sent");

    Ok(Json(json!({
        "success": true,
        "message": "Message sent successfully",
        "response": response,
    })))
}

/// GET /chats/:chatId/messages
///
/// Proxies the session's message history from the platform.
pub async fn get_chat_messages_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_chat(&state, &chat_id).await?;

    let messages = state
        .platform
        .list_messages(&chat_id)
        .await
        .map_err(platform_err_to_response)?;

    Ok(Json(json!({"chat_id": chat_id, "messages": messages})))
}

/// GET /chats
pub async fn list_chats_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let chats = with_conn(&state.pool, list_calls).await?;
    let count = chats.len();
    Ok(Json(json!({"chats": chats, "count": count})))
}
