//! Store and registry tests over an in-memory database.

use rusqlite::Connection;
use serde_json::json;

use crate::call::{CallStatus, CallStatusUpdate, NewCall};
use crate::error::CallError;
use crate::registry::{apply_webhook, WebhookEnvelope};
use crate::store::{
    create_call, get_call, get_tool_invocations_for_call, get_webhooks_for_call, list_calls,
    log_tool_invocation, log_webhook, update_call_status,
};

fn test_conn() -> Connection {
    let conn = Connection::open_in_memory().expect("should open in-memory db");
    switchboard_db::run_migrations(&conn).expect("migrations should succeed");
    conn
}

fn sample_call(call_id: &str) -> NewCall {
    NewCall {
        call_id: call_id.to_string(),
        agent_id: "agent-1".to_string(),
        join_url: "wss://example.test/join".to_string(),
        metadata: Some(json!({"customer": "acme"})),
        raw_response: Some(json!({"callId": call_id, "joinUrl": "wss://example.test/join"})),
    }
}

fn webhook_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM webhooks", [], |row| row.get(0))
        .expect("should count webhooks")
}

// ── Store ────────────────────────────────────────────────────────────

#[test]
fn create_then_get_returns_created_call_with_fields_intact() {
    let conn = test_conn();
    create_call(&conn, &sample_call("abc123")).expect("create should succeed");

    let call = get_call(&conn, "abc123")
        .expect("get should succeed")
        .expect("call should exist");

    assert_eq!(call.call_id, "abc123");
    assert_eq!(call.agent_id, "agent-1");
    assert_eq!(call.join_url.as_deref(), Some("wss://example.test/join"));
    assert_eq!(call.status, CallStatus::Created);
    assert!(call.joined_at.is_none());
    assert!(call.ended_at.is_none());
    assert!(!call.created_at.is_empty());

    let metadata: serde_json::Value =
        serde_json::from_str(call.metadata.as_deref().unwrap()).unwrap();
    assert_eq!(metadata["customer"], "acme");
}

#[test]
fn create_duplicate_call_id_fails_with_duplicate() {
    let conn = test_conn();
    create_call(&conn, &sample_call("abc123")).expect("first create should succeed");

    let err = create_call(&conn, &sample_call("abc123"))
        .expect_err("second create should fail");
    match err {
        CallError::Duplicate(id) => assert_eq!(id, "abc123"),
        other => panic!("unexpected error: {other:?}"),
    }

    let calls = list_calls(&conn).expect("list should succeed");
    assert_eq!(calls.len(), 1, "duplicate create must not add a row");
}

#[test]
fn update_status_on_unknown_call_fails_with_not_found_and_writes_nothing() {
    let conn = test_conn();

    let err = update_call_status(
        &conn,
        "ghost",
        CallStatus::Ended,
        &CallStatusUpdate {
            ended_at: Some("2025-01-01T00:00:00Z".to_string()),
            end_reason: Some("hangup".to_string()),
            ..Default::default()
        },
    )
    .expect_err("update on unknown call should fail");

    match err {
        CallError::NotFound(id) => assert_eq!(id, "ghost"),
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(list_calls(&conn).expect("list should succeed").is_empty());
}

#[test]
fn update_status_is_a_partial_update() {
    let conn = test_conn();
    create_call(&conn, &sample_call("abc123")).expect("create should succeed");

    update_call_status(
        &conn,
        "abc123",
        CallStatus::Joined,
        &CallStatusUpdate {
            joined_at: Some("2025-01-01T00:00:00Z".to_string()),
            ..Default::default()
        },
    )
    .expect("joined update should succeed");

    update_call_status(
        &conn,
        "abc123",
        CallStatus::Ended,
        &CallStatusUpdate {
            ended_at: Some("2025-01-01T00:05:00Z".to_string()),
            end_reason: Some("agent_hangup".to_string()),
            short_summary: Some("resolved".to_string()),
            summary: Some("caller's issue was resolved".to_string()),
            ..Default::default()
        },
    )
    .expect("ended update should succeed");

    let call = get_call(&conn, "abc123").unwrap().unwrap();
    assert_eq!(call.status, CallStatus::Ended);
    // The ended update carried no joined_at, so the earlier value survives.
    assert_eq!(call.joined_at.as_deref(), Some("2025-01-01T00:00:00Z"));
    assert_eq!(call.ended_at.as_deref(), Some("2025-01-01T00:05:00Z"));
    assert_eq!(call.end_reason.as_deref(), Some("agent_hangup"));
    assert_eq!(call.short_summary.as_deref(), Some("resolved"));
}

#[test]
fn update_status_replay_is_a_no_op_in_effect() {
    let conn = test_conn();
    create_call(&conn, &sample_call("abc123")).expect("create should succeed");

    let update = CallStatusUpdate {
        ended_at: Some("2025-01-01T00:05:00Z".to_string()),
        end_reason: Some("hangup".to_string()),
        ..Default::default()
    };
    update_call_status(&conn, "abc123", CallStatus::Ended, &update).unwrap();
    let first = get_call(&conn, "abc123").unwrap().unwrap();

    update_call_status(&conn, "abc123", CallStatus::Ended, &update).unwrap();
    let second = get_call(&conn, "abc123").unwrap().unwrap();

    assert_eq!(first, second);
}

#[test]
fn status_transitions_are_last_write_wins() {
    let conn = test_conn();
    create_call(&conn, &sample_call("abc123")).expect("create should succeed");

    update_call_status(
        &conn,
        "abc123",
        CallStatus::Ended,
        &CallStatusUpdate {
            ended_at: Some("2025-01-01T00:05:00Z".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    // A late "started" arriving after "ended" is accepted unconditionally.
    update_call_status(&conn, "abc123", CallStatus::Started, &CallStatusUpdate::default())
        .unwrap();

    let call = get_call(&conn, "abc123").unwrap().unwrap();
    assert_eq!(call.status, CallStatus::Started);
    // Fields the late event did not carry are untouched.
    assert_eq!(call.ended_at.as_deref(), Some("2025-01-01T00:05:00Z"));
}

#[test]
fn list_calls_orders_newest_created_first() {
    let conn = test_conn();
    for (call_id, created_at) in [
        ("first", "2025-01-01 00:00:01"),
        ("second", "2025-01-01 00:00:02"),
        ("third", "2025-01-01 00:00:03"),
    ] {
        create_call(&conn, &sample_call(call_id)).expect("create should succeed");
        conn.execute(
            "UPDATE calls SET created_at = ?1 WHERE call_id = ?2",
            rusqlite::params![created_at, call_id],
        )
        .expect("should backdate created_at");
    }

    let calls = list_calls(&conn).expect("list should succeed");
    let ids: Vec<&str> = calls.iter().map(|c| c.call_id.as_str()).collect();
    assert_eq!(ids, ["third", "second", "first"]);
}

#[test]
fn log_webhook_never_checks_call_existence() {
    let conn = test_conn();
    log_webhook(&conn, "no-such-call", "call.joined", &json!({"event": "call.joined"}))
        .expect("log should succeed for unknown call");

    let events = get_webhooks_for_call(&conn, "no-such-call").unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "call.joined");
}

#[test]
fn tool_invocation_ids_are_strictly_increasing() {
    let conn = test_conn();
    create_call(&conn, &sample_call("abc123")).expect("create should succeed");

    let first = log_tool_invocation(
        &conn,
        "abc123",
        "escalate_to_human",
        &json!({"priority_level": "high"}),
    )
    .unwrap();
    let second = log_tool_invocation(
        &conn,
        "abc123",
        "escalate_to_human",
        &json!({"priority_level": "critical"}),
    )
    .unwrap();

    assert!(second > first, "invocation ids must increase: {first} then {second}");

    let invocations = get_tool_invocations_for_call(&conn, "abc123").unwrap();
    assert_eq!(invocations.len(), 2);
    assert_eq!(invocations[0].id, first);
    assert_eq!(invocations[1].id, second);
}

// ── Envelope parsing ─────────────────────────────────────────────────

#[test]
fn envelope_parse_requires_call_id() {
    let err = WebhookEnvelope::parse(json!({"event": "call.started", "call": {}}))
        .expect_err("missing callId should fail");
    assert!(matches!(err, CallError::MalformedPayload(_)));

    let err = WebhookEnvelope::parse(json!({"event": "call.started"}))
        .expect_err("missing call object should fail");
    assert!(matches!(err, CallError::MalformedPayload(_)));
}

#[test]
fn envelope_parse_tolerates_missing_event() {
    let envelope = WebhookEnvelope::parse(json!({"call": {"callId": "abc123"}}))
        .expect("callId alone should parse");
    assert_eq!(envelope.call_id, "abc123");
    assert_eq!(envelope.event, "");
}

// ── Registry ─────────────────────────────────────────────────────────

#[test]
fn started_webhook_for_unknown_call_creates_it() {
    let conn = test_conn();
    let envelope = WebhookEnvelope::parse(json!({
        "event": "call.started",
        "call": {"callId": "abc123", "agentId": "agent-1", "joinUrl": "wss://example.test/j"}
    }))
    .unwrap();

    let disposition = apply_webhook(&conn, &envelope).expect("apply should succeed");
    assert!(disposition.created);
    assert_eq!(disposition.status_applied, Some(CallStatus::Started));
    assert_eq!(webhook_count(&conn), 1);

    let call = get_call(&conn, "abc123").unwrap().expect("call should exist");
    assert_eq!(call.status, CallStatus::Started);
    assert_eq!(call.agent_id, "agent-1");
    assert_eq!(call.join_url.as_deref(), Some("wss://example.test/j"));
}

#[test]
fn duplicate_started_webhook_does_not_create_second_row() {
    let conn = test_conn();
    let envelope = WebhookEnvelope::parse(json!({
        "event": "call.started",
        "call": {"callId": "abc123", "agentId": "agent-1"}
    }))
    .unwrap();

    apply_webhook(&conn, &envelope).expect("first apply should succeed");
    let disposition = apply_webhook(&conn, &envelope).expect("second apply should succeed");

    assert!(!disposition.created, "replay must not create a second row");
    assert_eq!(webhook_count(&conn), 2, "every delivery is logged");
    assert_eq!(list_calls(&conn).unwrap().len(), 1);
}

#[test]
fn started_webhook_defaults_missing_fields_to_empty() {
    let conn = test_conn();
    let envelope = WebhookEnvelope::parse(json!({
        "event": "call.started",
        "call": {"callId": "bare"}
    }))
    .unwrap();

    apply_webhook(&conn, &envelope).expect("apply should succeed");

    let call = get_call(&conn, "bare").unwrap().unwrap();
    assert_eq!(call.agent_id, "");
    assert_eq!(call.join_url.as_deref(), Some(""));
}

#[test]
fn joined_webhook_sets_status_and_joined_at() {
    let conn = test_conn();
    create_call(&conn, &sample_call("abc123")).unwrap();

    let envelope = WebhookEnvelope::parse(json!({
        "event": "call.joined",
        "call": {"callId": "abc123", "joined": "2025-01-01T00:00:00Z"}
    }))
    .unwrap();
    apply_webhook(&conn, &envelope).expect("apply should succeed");

    let call = get_call(&conn, "abc123").unwrap().unwrap();
    assert_eq!(call.status, CallStatus::Joined);
    assert_eq!(call.joined_at.as_deref(), Some("2025-01-01T00:00:00Z"));
}

#[test]
fn ended_webhook_carries_terminal_fields() {
    let conn = test_conn();
    create_call(&conn, &sample_call("abc123")).unwrap();

    let envelope = WebhookEnvelope::parse(json!({
        "event": "call.ended",
        "call": {
            "callId": "abc123",
            "ended": "2025-01-01T00:05:00Z",
            "endReason": "agent_hangup",
            "shortSummary": "resolved",
            "summary": "the caller's billing issue was resolved"
        }
    }))
    .unwrap();
    apply_webhook(&conn, &envelope).expect("apply should succeed");

    let call = get_call(&conn, "abc123").unwrap().unwrap();
    assert_eq!(call.status, CallStatus::Ended);
    assert_eq!(call.ended_at.as_deref(), Some("2025-01-01T00:05:00Z"));
    assert_eq!(call.end_reason.as_deref(), Some("agent_hangup"));
    assert_eq!(call.short_summary.as_deref(), Some("resolved"));
    assert_eq!(
        call.summary.as_deref(),
        Some("the caller's billing issue was resolved")
    );
}

#[test]
fn unrecognized_event_is_logged_without_status_change() {
    let conn = test_conn();
    create_call(&conn, &sample_call("abc123")).unwrap();

    let envelope = WebhookEnvelope::parse(json!({
        "event": "call.transcript_ready",
        "call": {"callId": "abc123"}
    }))
    .unwrap();
    let disposition = apply_webhook(&conn, &envelope).expect("apply should succeed");

    assert!(disposition.status_applied.is_none());
    assert_eq!(webhook_count(&conn), 1);

    let call = get_call(&conn, "abc123").unwrap().unwrap();
    assert_eq!(call.status, CallStatus::Created);
}

#[test]
fn joined_webhook_for_unknown_call_is_logged_but_creates_nothing() {
    let conn = test_conn();
    let envelope = WebhookEnvelope::parse(json!({
        "event": "call.joined",
        "call": {"callId": "early-bird", "joined": "2025-01-01T00:00:00Z"}
    }))
    .unwrap();

    let disposition = apply_webhook(&conn, &envelope).expect("apply should succeed");
    assert!(!disposition.created);
    assert!(disposition.status_applied.is_none());

    // The event is durable even though no call row exists.
    assert_eq!(get_webhooks_for_call(&conn, "early-bird").unwrap().len(), 1);
    assert!(get_call(&conn, "early-bird").unwrap().is_none());
}
