//! Platform client tests against a stub upstream bound to an ephemeral port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use switchboard_platform::{PlatformClient, PlatformConfig};

/// Captures the last call-creation body the stub received.
#[derive(Clone, Default)]
struct StubState {
    last_create_body: Arc<Mutex<Option<Value>>>,
}

async fn stub_create_call(
    State(state): State<StubState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    *state.last_create_body.lock().unwrap() = Some(body);
    (
        StatusCode::CREATED,
        Json(json!({
            "callId": "stub-call-1",
            "joinUrl": "wss://stub.test/join",
        })),
    )
}

async fn stub_reject_call() -> (StatusCode, String) {
    (StatusCode::PAYMENT_REQUIRED, "quota exhausted".to_string())
}

async fn stub_messages() -> Json<Value> {
    Json(json!({"results": [{"role": "agent", "text": "hello"}]}))
}

async fn start_stub(app: Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind ephemeral port");
    let addr = listener.local_addr().expect("should read local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub serve failed");
    });
    addr
}

fn client_for(addr: std::net::SocketAddr) -> PlatformClient {
    let config = PlatformConfig {
        base_url: format!("http://{addr}"),
        api_key: "test-key".to_string(),
        agent_id: "agent-1".to_string(),
        webhook_base_url: "http://tracker.test".to_string(),
        request_timeout_secs: 5,
        ..Default::default()
    };
    PlatformClient::new(config).expect("client should build")
}

#[tokio::test]
async fn create_webrtc_call_posts_payload_and_parses_response() {
    let state = StubState::default();
    let app = Router::new()
        .route("/agents/{agent_id}/calls", post(stub_create_call))
        .with_state(state.clone());
    let addr = start_stub(app).await;

    let client = client_for(addr);
    let mut metadata = HashMap::new();
    metadata.insert("customer".to_string(), "acme".to_string());

    let response = client
        .create_webrtc_call(&metadata, true, "(New Call) Answer the phone.")
        .await
        .expect("creation should succeed");

    assert_eq!(response.call_id, "stub-call-1");
    assert_eq!(response.join_url.as_deref(), Some("wss://stub.test/join"));
    assert!(response.sip_uri.is_none());

    let body = state
        .last_create_body
        .lock()
        .unwrap()
        .clone()
        .expect("stub should have seen a body");
    assert_eq!(body["recordingEnabled"], true);
    assert_eq!(body["metadata"]["customer"], "acme");
    assert_eq!(
        body["firstSpeakerSettings"]["agent"]["prompt"],
        "(New Call) Answer the phone."
    );
    assert_eq!(body["callbacks"]["joined"]["url"], "http://tracker.test/webhook");
    assert_eq!(body["callbacks"]["ended"]["url"], "http://tracker.test/webhook");
}

#[tokio::test]
async fn create_text_chat_uses_text_output_medium() {
    let state = StubState::default();
    let app = Router::new()
        .route("/agents/{agent_id}/calls", post(stub_create_call))
        .with_state(state.clone());
    let addr = start_stub(app).await;

    let client = client_for(addr);
    let mut metadata = HashMap::new();
    metadata.insert("channel".to_string(), "web".to_string());

    let response = client
        .create_text_chat(&metadata)
        .await
        .expect("chat creation should succeed");
    assert_eq!(response.call_id, "stub-call-1");

    let body = state
        .last_create_body
        .lock()
        .unwrap()
        .clone()
        .expect("stub should have seen a body");
    assert_eq!(body["initialOutputMedium"], "MESSAGE_MEDIUM_TEXT");
    assert_eq!(body["medium"]["webRtc"]["dataMessages"]["transcript"], true);
    assert_eq!(body["metadata"]["channel"], "web");
    assert_eq!(body["callbacks"]["joined"]["url"], "http://tracker.test/webhook");
}

#[tokio::test]
async fn create_sip_outbound_call_builds_sip_medium() {
    let state = StubState::default();
    let app = Router::new()
        .route("/agents/{agent_id}/calls", post(stub_create_call))
        .with_state(state.clone());
    let addr = start_stub(app).await;

    let config = PlatformConfig {
        base_url: format!("http://{addr}"),
        api_key: "test-key".to_string(),
        agent_id: "agent-1".to_string(),
        sip_domain: "sip.example.test".to_string(),
        sip_username: "sb".to_string(),
        sip_password: "secret".to_string(),
        sip_from_number: "+15550100".to_string(),
        request_timeout_secs: 5,
        ..Default::default()
    };
    let client = PlatformClient::new(config).expect("client should build");

    client
        .create_sip_outbound_call("+15550199", &HashMap::new())
        .await
        .expect("creation should succeed");

    let body = state
        .last_create_body
        .lock()
        .unwrap()
        .clone()
        .expect("stub should have seen a body");
    let outgoing = &body["medium"]["sip"]["outgoing"];
    assert_eq!(outgoing["to"], "sip:+15550199@sip.example.test");
    assert_eq!(outgoing["from"], "+15550100");
    assert_eq!(outgoing["username"], "sb");
    assert!(
        body.get("templateContext").is_none(),
        "empty template context should be omitted"
    );
}

#[tokio::test]
async fn non_201_creation_surfaces_rejected_with_upstream_body() {
    let app = Router::new().route("/agents/{agent_id}/calls", post(stub_reject_call));
    let addr = start_stub(app).await;

    let client = client_for(addr);
    let err = client
        .create_webrtc_call(&HashMap::new(), false, "")
        .await
        .expect_err("rejection should surface");

    match err {
        switchboard_platform::PlatformError::Rejected { status, body } => {
            assert_eq!(status, 402);
            assert_eq!(body, "quota exhausted");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_platform_surfaces_unavailable() {
    // Bind and immediately drop a listener so the port is closed.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind ephemeral port");
    let addr = listener.local_addr().expect("should read local addr");
    drop(listener);

    let client = client_for(addr);
    let err = client
        .create_webrtc_call(&HashMap::new(), false, "")
        .await
        .expect_err("connection failure should surface");

    assert!(matches!(
        err,
        switchboard_platform::PlatformError::Unavailable(_)
    ));
}

#[tokio::test]
async fn send_data_message_posts_user_text_message() {
    let state = StubState::default();

    async fn stub_data_message(
        State(state): State<StubState>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        *state.last_create_body.lock().unwrap() = Some(body);
        (StatusCode::OK, Json(json!({"delivered": true})))
    }

    let app = Router::new()
        .route("/calls/{call_id}/data-message", post(stub_data_message))
        .with_state(state.clone());
    let addr = start_stub(app).await;

    let client = client_for(addr);
    let response = client
        .send_data_message("stub-call-1", "hello agent")
        .await
        .expect("message send should succeed");
    assert_eq!(response["delivered"], true);

    let body = state
        .last_create_body
        .lock()
        .unwrap()
        .clone()
        .expect("stub should have seen a body");
    assert_eq!(body["type"], "user_text_message");
    assert_eq!(body["text"], "hello agent");
    assert_eq!(body["urgency"], "soon");
}

#[tokio::test]
async fn list_messages_returns_results_array() {
    let app = Router::new().route("/calls/{call_id}/messages", get(stub_messages));
    let addr = start_stub(app).await;

    let client = client_for(addr);
    let messages = client
        .list_messages("stub-call-1")
        .await
        .expect("transcript fetch should succeed");

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["text"], "hello");
}
