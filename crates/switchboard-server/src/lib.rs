//! Switchboard server library logic.

pub mod api_calls;
pub mod api_chats;
pub mod api_tools;
pub mod api_webhook;
pub mod config;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use switchboard_calls::CallError;
use switchboard_db::DbPool;
use switchboard_platform::{PlatformClient, PlatformError};
use tower_http::cors::{Any, CorsLayer};
use serde_json::{json, Value};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Client for the remote voice-agent platform, built once at startup.
    pub platform: Arc<PlatformClient>,
}

/// Maximum request body size (2 MiB). Protects against OOM from oversized payloads.
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// A JSON error body paired with its status code.
pub type ApiError = (StatusCode, Json<Value>);

/// Builds a `{ "detail": ... }` error response, the shape every error path
/// in this API uses.
pub(crate) fn error_response(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (status, Json(json!({"detail": detail.into()})))
}

/// Maps a [`CallError`] to the correct HTTP response, logging 5xx causes.
///
/// `NotFound` → 404, `Duplicate` → 409, `MalformedPayload` → 400,
/// everything else → 500.
pub(crate) fn call_err_to_response(e: CallError) -> ApiError {
    match e {
        CallError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "Call not found"),
        CallError::Duplicate(id) => {
            error_response(StatusCode::CONFLICT, format!("call already exists: {id}"))
        }
        CallError::MalformedPayload(msg) => error_response(StatusCode::BAD_REQUEST, msg),
        err => {
            tracing::error!(error = %err, "call store operation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "store error")
        }
    }
}

/// Maps a [`PlatformError`] to the correct HTTP response.
///
/// Rejections pass the upstream status and body through so the caller can
/// see what the platform said; unreachability becomes 502.
pub(crate) fn platform_err_to_response(e: PlatformError) -> ApiError {
    match e {
        PlatformError::Rejected { status, body } => {
            let status =
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            error_response(status, format!("voice platform error: {body}"))
        }
        err => {
            tracing::error!(error = %err, "voice platform request failed");
            error_response(StatusCode::BAD_GATEWAY, err.to_string())
        }
    }
}

/// Runs a store closure on a pooled connection inside `spawn_blocking`.
///
/// Every store call is an I/O-bound suspension point; no lock is held
/// across it and no request blocks another's progress.
pub(crate) async fn with_conn<T, F>(pool: &DbPool, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T, CallError> + Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| {
            tracing::error!(error = %e, "failed to get database connection");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "store unavailable")
        })?;
        f(&conn).map_err(call_err_to_response)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "store task join error");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "store task failed")
    })?
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/calls",
            post(api_calls::create_call_handler).get(api_calls::list_calls_handler),
        )
        .route(
            "/calls/sip/inbound",
            post(api_calls::create_sip_inbound_handler),
        )
        .route(
            "/calls/sip/outbound",
            post(api_calls::create_sip_outbound_handler),
        )
        .route("/calls/{callId}", get(api_calls::get_call_handler))
        .route(
            "/calls/{callId}/messages",
            get(api_calls::get_call_messages_handler),
        )
        .route(
            "/calls/{callId}/recording",
            get(api_calls::get_call_recording_handler),
        )
        .route(
            "/chats",
            post(api_chats::create_chat_handler).get(api_chats::list_chats_handler),
        )
        .route(
            "/chats/{chatId}/messages",
            post(api_chats::send_chat_message_handler).get(api_chats::get_chat_messages_handler),
        )
        .route("/webhook", post(api_webhook::receive_webhook_handler))
        .route(
            "/tools/escalate_to_human",
            post(api_tools::escalate_to_human_handler),
        )
        .route(
            "/tools/log_call_engagement",
            post(api_tools::log_call_engagement_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
