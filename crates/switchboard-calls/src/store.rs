//! Persistence operations for calls, webhook events, and tool invocations.
//!
//! Every write here is a single-row commit; there is no multi-row
//! transaction spanning a call plus its logs. That keeps each write
//! independently retryable: webhook and tool rows are pure appends, and
//! call creation / status updates are idempotent per `call_id`.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::call::{Call, CallStatus, CallStatusUpdate, NewCall, ToolInvocation, WebhookEvent};
use crate::error::CallError;

/// Creates a new call row with `status = created`.
///
/// # Errors
///
/// Returns `CallError::Duplicate` if a row with this `call_id` already
/// exists, or `CallError::Database` on any other SQL failure.
pub fn create_call(conn: &Connection, new_call: &NewCall) -> Result<(), CallError> {
    let metadata_json = new_call
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let raw_response_json = new_call
        .raw_response
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO calls (call_id, agent_id, join_url, status, metadata, raw_response)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new_call.call_id,
            new_call.agent_id,
            new_call.join_url,
            CallStatus::Created.as_str(),
            metadata_json,
            raw_response_json,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ffi::ErrorCode::ConstraintViolation =>
        {
            CallError::Duplicate(new_call.call_id.clone())
        }
        other => CallError::Database(other),
    })?;

    Ok(())
}

/// Applies a status transition to an existing call in a single atomic
/// UPDATE statement.
///
/// The status column is always written; fields in `update` reach the
/// statement only when `Some`, so unset fields on the row stay untouched.
/// This avoids the read-modify-write race of fetching the call, mutating
/// in memory, and writing back.
///
/// # Errors
///
/// Returns `CallError::NotFound` if no row matches `call_id`.
pub fn update_call_status(
    conn: &Connection,
    call_id: &str,
    status: CallStatus,
    update: &CallStatusUpdate,
) -> Result<(), CallError> {
    let mut set_parts: Vec<String> = vec!["status = ?1".to_string()];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> =
        vec![Box::new(status.as_str().to_string())];
    let mut idx = 2usize;

    if let Some(joined_at) = &update.joined_at {
        set_parts.push(format!("joined_at = ?{}", idx));
        values.push(Box::new(joined_at.clone()));
        idx += 1;
    }
    if let Some(ended_at) = &update.ended_at {
        set_parts.push(format!("ended_at = ?{}", idx));
        values.push(Box::new(ended_at.clone()));
        idx += 1;
    }
    if let Some(end_reason) = &update.end_reason {
        set_parts.push(format!("end_reason = ?{}", idx));
        values.push(Box::new(end_reason.clone()));
        idx += 1;
    }
    if let Some(short_summary) = &update.short_summary {
        set_parts.push(format!("short_summary = ?{}", idx));
        values.push(Box::new(short_summary.clone()));
        idx += 1;
    }
    if let Some(summary) = &update.summary {
        set_parts.push(format!("summary = ?{}", idx));
        values.push(Box::new(summary.clone()));
        idx += 1;
    }

    let sql = format!(
        "UPDATE calls SET {} WHERE call_id = ?{}",
        set_parts.join(", "),
        idx
    );
    values.push(Box::new(call_id.to_string()));

    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        values.iter().map(|v| v.as_ref()).collect();
    let count = conn.execute(&sql, params_refs.as_slice())?;
    if count == 0 {
        return Err(CallError::NotFound(call_id.to_string()));
    }
    Ok(())
}

/// Appends a webhook event to the log.
///
/// Never validates that `call_id` refers to an existing call — events may
/// arrive before the call row exists, and the log must capture them anyway.
pub fn log_webhook(
    conn: &Connection,
    call_id: &str,
    event_type: &str,
    payload: &serde_json::Value,
) -> Result<(), CallError> {
    let payload_json = serde_json::to_string(payload)?;
    conn.execute(
        "INSERT INTO webhooks (call_id, event_type, payload) VALUES (?1, ?2, ?3)",
        params![call_id, event_type, payload_json],
    )?;
    Ok(())
}

/// Appends a tool invocation and returns its store-assigned ID.
///
/// Call existence is enforced by the caller, not here: the HTTP boundary
/// rejects unknown calls with 404 before this insert runs.
pub fn log_tool_invocation(
    conn: &Connection,
    call_id: &str,
    tool_name: &str,
    parameters: &serde_json::Value,
) -> Result<i64, CallError> {
    let parameters_json = serde_json::to_string(parameters)?;
    let id = conn.query_row(
        "INSERT INTO tool_invocations (call_id, tool_name, parameters)
         VALUES (?1, ?2, ?3)
         RETURNING id",
        params![call_id, tool_name, parameters_json],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Retrieves a call by its platform-assigned ID.
pub fn get_call(conn: &Connection, call_id: &str) -> Result<Option<Call>, CallError> {
    let call = conn
        .query_row(
            "SELECT id, call_id, agent_id, join_url, status, created_at,
                    joined_at, ended_at, end_reason, short_summary, summary,
                    metadata, raw_response
             FROM calls WHERE call_id = ?1",
            [call_id],
            map_row_to_call,
        )
        .optional()?;
    Ok(call)
}

/// Lists all calls, newest created first.
pub fn list_calls(conn: &Connection) -> Result<Vec<Call>, CallError> {
    let mut stmt = conn.prepare(
        "SELECT id, call_id, agent_id, join_url, status, created_at,
                joined_at, ended_at, end_reason, short_summary, summary,
                metadata, raw_response
         FROM calls ORDER BY created_at DESC, id DESC",
    )?;

    let rows = stmt.query_map([], map_row_to_call)?;
    let mut calls = Vec::new();
    for row in rows {
        calls.push(row?);
    }
    Ok(calls)
}

/// Retrieves all logged webhook events for a call, in receipt order.
pub fn get_webhooks_for_call(
    conn: &Connection,
    call_id: &str,
) -> Result<Vec<WebhookEvent>, CallError> {
    let mut stmt = conn.prepare(
        "SELECT id, call_id, event_type, payload, received_at
         FROM webhooks WHERE call_id = ?1 ORDER BY received_at, id",
    )?;

    let rows = stmt.query_map([call_id], |row| {
        Ok(WebhookEvent {
            id: row.get(0)?,
            call_id: row.get(1)?,
            event_type: row.get(2)?,
            payload: row.get(3)?,
            received_at: row.get(4)?,
        })
    })?;

    let mut events = Vec::new();
    for row in rows {
        events.push(row?);
    }
    Ok(events)
}

/// Retrieves all tool invocations for a call, in invocation order.
pub fn get_tool_invocations_for_call(
    conn: &Connection,
    call_id: &str,
) -> Result<Vec<ToolInvocation>, CallError> {
    let mut stmt = conn.prepare(
        "SELECT id, call_id, tool_name, parameters, invoked_at
         FROM tool_invocations WHERE call_id = ?1 ORDER BY invoked_at, id",
    )?;

    let rows = stmt.query_map([call_id], |row| {
        Ok(ToolInvocation {
            id: row.get(0)?,
            call_id: row.get(1)?,
            tool_name: row.get(2)?,
            parameters: row.get(3)?,
            invoked_at: row.get(4)?,
        })
    })?;

    let mut invocations = Vec::new();
    for row in rows {
        invocations.push(row?);
    }
    Ok(invocations)
}

fn map_row_to_call(row: &Row) -> rusqlite::Result<Call> {
    let status_str: String = row.get(4)?;
    let status: CallStatus = status_str.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Call {
        id: row.get(0)?,
        call_id: row.get(1)?,
        agent_id: row.get(2)?,
        join_url: row.get(3)?,
        status,
        created_at: row.get(5)?,
        joined_at: row.get(6)?,
        ended_at: row.get(7)?,
        end_reason: row.get(8)?,
        short_summary: row.get(9)?,
        summary: row.get(10)?,
        metadata: row.get(11)?,
        raw_response: row.get(12)?,
    })
}
