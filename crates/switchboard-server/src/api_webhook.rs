//! Webhook ingestion endpoint.
//!
//! `POST /webhook` accepts lifecycle events from the voice-agent platform.
//! Presence of `call.callId` is the only validation performed before the
//! event is made durable; everything after the log write is best-effort
//! reconciliation, and a non-2xx answer tells the platform to redeliver
//! (which is safe — creation and status updates are idempotent replays).

use crate::{call_err_to_response, error_response, with_conn, ApiError, AppState};
use axum::{extract::Extension, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;
use switchboard_calls::{apply_webhook, CallError, WebhookEnvelope};

/// POST /webhook
pub async fn receive_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let envelope = WebhookEnvelope::parse(payload).map_err(|e| match e {
        CallError::MalformedPayload(msg) => {
            error_response(StatusCode::BAD_REQUEST, format!("invalid webhook payload: {msg}"))
        }
        other => call_err_to_response(other),
    })?;

    let disposition = with_conn(&state.pool, move |conn| apply_webhook(conn, &envelope)).await?;

    tracing::info!(
        event = %disposition.event,
        call_id = %disposition.call_id,
        created = disposition.created,
        "webhook processed"
    );

    Ok(Json(json!({
        "status": "success",
        "event": disposition.event,
        "call_id": disposition.call_id,
    })))
}
