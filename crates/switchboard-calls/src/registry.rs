//! The call registry: the thin state-machine layer that turns a received
//! webhook into store writes.
//!
//! Processing order per event, fixed by design:
//!
//! 1. Append the raw payload to the webhook log (always).
//! 2. Look up the call.
//! 3. If absent and the event is `call.started`, create the row from
//!    payload fields (missing fields default to empty).
//! 4. Apply the transition table to status and terminal fields.
//!
//! The registry never rejects an event for being out of order. The upstream
//! channel has no ordering guarantee, so any status may overwrite any other
//! (last message wins per field) rather than a strict automaton getting
//! stuck rejecting valid late arrivals.

use rusqlite::Connection;
use serde_json::Value;

use crate::call::{CallStatus, CallStatusUpdate, NewCall};
use crate::error::CallError;
use crate::store;

/// A validated inbound webhook.
///
/// `call_id` presence is the only hard validation performed on a webhook;
/// everything else in the payload is optional and consumed best-effort.
#[derive(Debug, Clone)]
pub struct WebhookEnvelope {
    /// The `event` field as received; empty if the sender omitted it.
    pub event: String,
    /// The `call.callId` field. Required.
    pub call_id: String,
    /// The full received body, logged verbatim.
    pub payload: Value,
}

impl WebhookEnvelope {
    /// Extracts the envelope from an arbitrary JSON body.
    ///
    /// # Errors
    ///
    /// Returns `CallError::MalformedPayload` if `call.callId` is absent —
    /// this check runs before anything is logged, so payloads with no call
    /// identity never enter the webhook log.
    pub fn parse(payload: Value) -> Result<Self, CallError> {
        let call_id = payload
            .get("call")
            .and_then(|c| c.get("callId"))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CallError::MalformedPayload("missing call.callId".to_string()))?
            .to_string();

        let event = payload
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            event,
            call_id,
            payload,
        })
    }

    fn call_field(&self, key: &str) -> Option<&str> {
        self.payload
            .get("call")
            .and_then(|c| c.get(key))
            .and_then(Value::as_str)
    }
}

/// What a processed webhook did to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookDisposition {
    /// The event type that was processed.
    pub event: String,
    /// The call the event referred to.
    pub call_id: String,
    /// Whether a call row was created from this event.
    pub created: bool,
    /// The status written, if the event type was recognized and a row
    /// existed to update.
    pub status_applied: Option<CallStatus>,
}

/// Applies a webhook to the store: log, reconcile creation, transition.
///
/// The log write happens first and unconditionally, so a failure in the
/// creation or transition steps never loses the raw event — the sender can
/// retry and the replay is idempotent.
///
/// # Errors
///
/// Returns `CallError` on store failure after the event was logged (or on
/// the log write itself).
pub fn apply_webhook(
    conn: &Connection,
    envelope: &WebhookEnvelope,
) -> Result<WebhookDisposition, CallError> {
    store::log_webhook(conn, &envelope.call_id, &envelope.event, &envelope.payload)?;

    let mut created = false;
    let mut exists = store::get_call(conn, &envelope.call_id)?.is_some();

    if !exists && envelope.event == "call.started" {
        let new_call = NewCall {
            call_id: envelope.call_id.clone(),
            agent_id: envelope.call_field("agentId").unwrap_or_default().to_string(),
            join_url: envelope.call_field("joinUrl").unwrap_or_default().to_string(),
            metadata: None,
            raw_response: envelope.payload.get("call").cloned(),
        };
        match store::create_call(conn, &new_call) {
            Ok(()) => {
                tracing::info!(call_id = %envelope.call_id, "created call from webhook");
                created = true;
            }
            // A concurrent delivery of the same event won the insert; the
            // row exists either way and the transition below still applies.
            Err(CallError::Duplicate(_)) => {}
            Err(e) => return Err(e),
        }
        exists = true;
    }

    let transition = match envelope.event.as_str() {
        "call.started" => Some((CallStatus::Started, CallStatusUpdate::default())),
        "call.joined" => Some((
            CallStatus::Joined,
            CallStatusUpdate {
                joined_at: envelope.call_field("joined").map(str::to_string),
                ..Default::default()
            },
        )),
        "call.ended" => Some((
            CallStatus::Ended,
            CallStatusUpdate {
                ended_at: envelope.call_field("ended").map(str::to_string),
                end_reason: envelope.call_field("endReason").map(str::to_string),
                short_summary: envelope.call_field("shortSummary").map(str::to_string),
                summary: envelope.call_field("summary").map(str::to_string),
                ..Default::default()
            },
        )),
        // Unrecognized event types are logged but change no status.
        _ => None,
    };

    let status_applied = match transition {
        Some((status, update)) if exists => {
            store::update_call_status(conn, &envelope.call_id, status, &update)?;
            Some(status)
        }
        Some((status, _)) => {
            // A recognized transition for a call we have never seen created
            // (e.g. call.joined arriving before call.started). The event is
            // already durable in the log; a later replay of the creation
            // event reconciles the row.
            tracing::debug!(
                call_id = %envelope.call_id,
                event = %envelope.event,
                status = %status,
                "transition for unknown call, logged without status update"
            );
            None
        }
        None => None,
    };

    Ok(WebhookDisposition {
        event: envelope.event.clone(),
        call_id: envelope.call_id.clone(),
        created,
        status_applied,
    })
}
