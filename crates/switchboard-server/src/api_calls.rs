//! Call management endpoints: creation (WebRTC and SIP), listing, detail
//! aggregation, and transcript/recording proxies.

use crate::{error_response, platform_err_to_response, with_conn, ApiError, AppState};
use axum::{
    extract::{Extension, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_calls::{
    create_call, get_call, get_tool_invocations_for_call, get_webhooks_for_call, list_calls,
    NewCall,
};
use switchboard_platform::PlatformCallResponse;

fn default_recording_enabled() -> bool {
    true
}

fn default_first_speaker_prompt() -> String {
    "(New Call) Respond as if you are answering the phone.".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateCallRequest {
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default = "default_recording_enabled")]
    pub recording_enabled: bool,
    #[serde(default = "default_first_speaker_prompt")]
    pub first_speaker_prompt: String,
}

#[derive(Debug, Serialize)]
pub struct CreateCallResponse {
    pub call_id: String,
    pub join_url: String,
    pub agent_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct CreateSipCallRequest {
    #[serde(default)]
    pub template_context: HashMap<String, String>,
    /// Phone number to call; required for outbound calls only.
    pub to_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateSipCallResponse {
    pub call_id: String,
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sip_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_number: Option<String>,
}

/// Persists a freshly created platform call with `status = created`.
async fn store_created_call(
    state: &AppState,
    created: &PlatformCallResponse,
    metadata: Option<Value>,
) -> Result<(), ApiError> {
    let new_call = NewCall {
        call_id: created.call_id.clone(),
        agent_id: state.platform.agent_id().to_string(),
        join_url: created.join_url.clone().unwrap_or_default(),
        metadata,
        raw_response: Some(created.raw.clone()),
    };
    with_conn(&state.pool, move |conn| create_call(conn, &new_call)).await
}

/// POST /calls
///
/// Creates a WebRTC call on the platform and records it locally. Upstream
/// errors pass the platform's status and body through.
pub async fn create_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateCallRequest>,
) -> Result<Json<CreateCallResponse>, ApiError> {
    tracing::info!(metadata = ?payload.metadata, "creating call");

    let created = state
        .platform
        .create_webrtc_call(
            &payload.metadata,
            payload.recording_enabled,
            &payload.first_speaker_prompt,
        )
        .await
        .map_err(platform_err_to_response)?;

    store_created_call(&state, &created, Some(json!(payload.metadata))).await?;

    Ok(Json(CreateCallResponse {
        call_id: created.call_id,
        join_url: created.join_url.unwrap_or_default(),
        agent_id: state.platform.agent_id().to_string(),
        status: "created".to_string(),
        message: "Call created successfully".to_string(),
    }))
}

/// POST /calls/sip/inbound
///
/// Creates an inbound SIP call; users dial the returned SIP URI to reach
/// the agent. No join URL exists for SIP sessions.
pub async fn create_sip_inbound_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateSipCallRequest>,
) -> Result<Json<CreateSipCallResponse>, ApiError> {
    let created = state
        .platform
        .create_sip_inbound_call(&payload.template_context)
        .await
        .map_err(platform_err_to_response)?;

    store_created_call(&state, &created, None).await?;

    tracing::info!(call_id = %created.call_id, sip_uri = ?created.sip_uri, "inbound SIP call created");

    Ok(Json(CreateSipCallResponse {
        call_id: created.call_id,
        status: "created".to_string(),
        message: "Inbound SIP call created successfully. Users can dial the SIP URI.".to_string(),
        sip_uri: created.sip_uri,
        to_number: None,
    }))
}

/// POST /calls/sip/outbound
///
/// Creates an outbound SIP call; the agent dials the given number.
pub async fn create_sip_outbound_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<CreateSipCallRequest>,
) -> Result<Json<CreateSipCallResponse>, ApiError> {
    let to_number = payload
        .to_number
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "to_number is required"))?
        .to_string();

    let created = state
        .platform
        .create_sip_outbound_call(&to_number, &payload.template_context)
        .await
        .map_err(platform_err_to_response)?;

    store_created_call(&state, &created, None).await?;

    tracing::info!(call_id = %created.call_id, to_number = %to_number, "outbound SIP call created");

    Ok(Json(CreateSipCallResponse {
        call_id: created.call_id,
        status: "created".to_string(),
        message: format!("Outbound call initiated to {to_number}"),
        sip_uri: None,
        to_number: Some(to_number),
    }))
}

/// GET /calls
pub async fn list_calls_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
    let calls = with_conn(&state.pool, list_calls).await?;
    let count = calls.len();
    Ok(Json(json!({"calls": calls, "count": count})))
}

/// GET /calls/:callId
///
/// Returns the call plus everything recorded against it: the webhook log
/// and the tool invocations, each in receipt/invocation order.
pub async fn get_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let detail = with_conn(&state.pool, move |conn| {
        let Some(call) = get_call(conn, &call_id)? else {
            return Ok(None);
        };
        let webhooks = get_webhooks_for_call(conn, &call_id)?;
        let tool_invocations = get_tool_invocations_for_call(conn, &call_id)?;
        Ok(Some((call, webhooks, tool_invocations)))
    })
    .await?;

    let (call, webhooks, tool_invocations) =
        detail.ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Call not found"))?;

    Ok(Json(json!({
        "call": call,
        "webhooks": webhooks,
        "tool_invocations": tool_invocations,
    })))
}

/// Returns 404 unless the call exists locally.
async fn require_call(state: &AppState, call_id: &str) -> Result<(), ApiError> {
    let call_id = call_id.to_string();
    let exists = with_conn(&state.pool, move |conn| {
        Ok(get_call(conn, &call_id)?.is_some())
    })
    .await?;
    if exists {
        Ok(())
    } else {
        Err(error_response(StatusCode::NOT_FOUND, "Call not found"))
    }
}

/// GET /calls/:callId/messages
///
/// Proxies the call transcript from the platform. The call must be known
/// locally; the transcript itself is never stored here.
pub async fn get_call_messages_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_call(&state, &call_id).await?;

    let messages = state
        .platform
        .list_messages(&call_id)
        .await
        .map_err(platform_err_to_response)?;

    Ok(Json(json!({"messages": messages})))
}

/// GET /calls/:callId/recording
///
/// Proxies the recording audio from the platform.
pub async fn get_call_recording_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_call(&state, &call_id).await?;

    let audio = state
        .platform
        .fetch_recording(&call_id)
        .await
        .map_err(platform_err_to_response)?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=recording-{call_id}.wav"),
            ),
        ],
        audio,
    ))
}
