//! Agent tool endpoints.
//!
//! The in-call agent invokes these over HTTP. Both tools resolve the call
//! ID from the request body first and the `X-Call-ID` header second, and
//! both refuse to log against a call this service has never seen.

use crate::{error_response, with_conn, ApiError, AppState};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use switchboard_calls::{get_call, log_tool_invocation};

const ESCALATE_TOOL: &str = "escalate_to_human";
const ENGAGEMENT_TOOL: &str = "log_call_engagement";

#[derive(Debug, Deserialize)]
pub struct EscalateToHumanRequest {
    pub call_id: Option<String>,
    pub escalation_reason: String,
    /// low, medium, high, critical
    pub priority_level: String,
    pub context_summary: String,
    /// angry, frustrated, neutral, satisfied, very_satisfied
    pub customer_sentiment: String,
}

#[derive(Debug, Deserialize)]
pub struct LogCallEngagementRequest {
    pub call_id: Option<String>,
    /// initial_contact, understanding_issue, providing_solution, closing_conversation
    pub call_phase: String,
    pub customer_sentiment: String,
    pub resolution_likelihood: i64,
    pub issue_resolved: bool,
    pub engagement_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ToolResponse {
    pub success: bool,
    pub message: String,
    pub tool_name: String,
    pub call_id: String,
    pub invocation_id: i64,
}

/// Picks the call ID from the body field, then the `X-Call-ID` header.
fn resolve_call_id(body_call_id: Option<String>, headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(id) = body_call_id.filter(|id| !id.is_empty()) {
        return Ok(id);
    }
    headers
        .get("X-Call-ID")
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "call_id missing from body and X-Call-ID header",
            )
        })
}

/// Verifies the call exists, appends the invocation, and builds the
/// common tool response.
async fn record_invocation(
    state: &AppState,
    call_id: String,
    tool_name: &'static str,
    parameters: Value,
    message: &'static str,
) -> Result<Json<ToolResponse>, ApiError> {
    let id_for_store = call_id.clone();
    let invocation_id = with_conn(&state.pool, move |conn| {
        if get_call(conn, &id_for_store)?.is_none() {
            return Err(switchboard_calls::CallError::NotFound(id_for_store));
        }
        log_tool_invocation(conn, &id_for_store, tool_name, &parameters)
    })
    .await?;

    Ok(Json(ToolResponse {
        success: true,
        message: message.to_string(),
        tool_name: tool_name.to_string(),
        call_id,
        invocation_id,
    }))
}

/// POST /tools/escalate_to_human
///
/// Invoked by the agent when the customer needs human intervention.
pub async fn escalate_to_human_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<EscalateToHumanRequest>,
) -> Result<Json<ToolResponse>, ApiError> {
    let call_id = resolve_call_id(payload.call_id, &headers)?;

    let parameters = json!({
        "escalation_reason": payload.escalation_reason,
        "priority_level": payload.priority_level,
        "context_summary": payload.context_summary,
        "customer_sentiment": payload.customer_sentiment,
    });

    tracing::info!(
        call_id = %call_id,
        reason = %payload.escalation_reason,
        priority = %payload.priority_level,
        "escalation requested"
    );

    record_invocation(
        &state,
        call_id,
        ESCALATE_TOOL,
        parameters,
        "Escalation logged successfully",
    )
    .await
}

/// POST /tools/log_call_engagement
///
/// Invoked by the agent at the end of every call to record engagement
/// metrics.
pub async fn log_call_engagement_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LogCallEngagementRequest>,
) -> Result<Json<ToolResponse>, ApiError> {
    let call_id = resolve_call_id(payload.call_id, &headers)?;

    if !(0..=100).contains(&payload.resolution_likelihood) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "resolution_likelihood must be between 0 and 100",
        ));
    }

    let parameters = json!({
        "call_phase": payload.call_phase,
        "customer_sentiment": payload.customer_sentiment,
        "resolution_likelihood": payload.resolution_likelihood,
        "issue_resolved": payload.issue_resolved,
        "engagement_notes": payload.engagement_notes,
    });

    tracing::info!(
        call_id = %call_id,
        phase = %payload.call_phase,
        resolution_likelihood = payload.resolution_likelihood,
        "engagement logged"
    );

    record_invocation(
        &state,
        call_id,
        ENGAGEMENT_TOOL,
        parameters,
        "Engagement metrics logged successfully",
    )
    .await
}
