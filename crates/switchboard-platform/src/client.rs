//! The platform HTTP client and call-creation payload builders.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};

use crate::config::PlatformConfig;
use crate::error::PlatformError;

/// A successfully created platform call.
#[derive(Debug, Clone)]
pub struct PlatformCallResponse {
    /// The platform-assigned call identifier.
    pub call_id: String,
    /// WebRTC join URL; absent for SIP/text sessions.
    pub join_url: Option<String>,
    /// SIP URI users can dial; present for inbound SIP calls.
    pub sip_uri: Option<String>,
    /// The full creation response, preserved verbatim for audit.
    pub raw: Value,
}

impl PlatformCallResponse {
    /// Extracts the fields this service relies on from a creation response.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::MissingField` if the response carries no
    /// `callId`. The platform assigns call identity; a call we cannot
    /// correlate with later webhooks is useless, so creation fails rather
    /// than minting a local id.
    fn from_raw(raw: Value) -> Result<Self, PlatformError> {
        let call_id = raw
            .get("callId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(PlatformError::MissingField("callId"))?
            .to_string();

        let join_url = raw
            .get("joinUrl")
            .and_then(Value::as_str)
            .map(str::to_string);

        let sip_uri = raw
            .get("medium")
            .and_then(|m| m.get("sip"))
            .and_then(|s| s.get("uri"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            call_id,
            join_url,
            sip_uri,
            raw,
        })
    }
}

/// Client for the remote voice-agent platform API.
///
/// Constructed once at startup and shared; the underlying reqwest client
/// pools connections internally.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    config: PlatformConfig,
    http: reqwest::Client,
}

impl PlatformClient {
    /// Builds a client with the configured per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::Config` if the HTTP client cannot be built.
    pub fn new(config: PlatformConfig) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| PlatformError::Config(e.to_string()))?;
        Ok(Self { config, http })
    }

    /// Whether the client is configured well enough to reach the platform.
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// The agent this client creates calls for.
    pub fn agent_id(&self) -> &str {
        &self.config.agent_id
    }

    /// Creates a WebRTC agent call with lifecycle webhook callbacks.
    pub async fn create_webrtc_call(
        &self,
        metadata: &HashMap<String, String>,
        recording_enabled: bool,
        first_speaker_prompt: &str,
    ) -> Result<PlatformCallResponse, PlatformError> {
        let webhook_url = self.config.webhook_url();
        let payload = json!({
            "medium": {"webRtc": {}},
            "recordingEnabled": recording_enabled,
            "metadata": metadata,
            "firstSpeakerSettings": {"agent": {"prompt": first_speaker_prompt}},
            "callbacks": {
                "joined": {"url": webhook_url},
                "ended": {"url": webhook_url},
            },
        });
        self.create_agent_call(&payload).await
    }

    /// Creates a text-only chat session.
    ///
    /// The platform models a chat as a call with a text output medium and
    /// transcript data messages enabled, so the same lifecycle webhooks
    /// apply.
    pub async fn create_text_chat(
        &self,
        metadata: &HashMap<String, String>,
    ) -> Result<PlatformCallResponse, PlatformError> {
        let webhook_url = self.config.webhook_url();
        let payload = json!({
            "initialOutputMedium": "MESSAGE_MEDIUM_TEXT",
            "medium": {"webRtc": {"dataMessages": {"transcript": true}}},
            "metadata": metadata,
            "callbacks": {
                "joined": {"url": webhook_url},
                "ended": {"url": webhook_url},
            },
        });
        self.create_agent_call(&payload).await
    }

    /// Creates an inbound SIP call users can dial in to.
    pub async fn create_sip_inbound_call(
        &self,
        template_context: &HashMap<String, String>,
    ) -> Result<PlatformCallResponse, PlatformError> {
        let mut payload = json!({
            "medium": {
                "sip": {
                    "incoming": {
                        "username": self.config.sip_username,
                        "password": self.config.sip_password,
                    }
                }
            }
        });
        if !template_context.is_empty() {
            payload["templateContext"] = json!(template_context);
        }
        self.create_agent_call(&payload).await
    }

    /// Creates an outbound SIP call to a phone number.
    pub async fn create_sip_outbound_call(
        &self,
        to_number: &str,
        template_context: &HashMap<String, String>,
    ) -> Result<PlatformCallResponse, PlatformError> {
        let mut payload = json!({
            "medium": {
                "sip": {
                    "outgoing": {
                        "to": format!("sip:{}@{}", to_number, self.config.sip_domain),
                        "from": self.config.sip_from_number,
                        "username": self.config.sip_username,
                        "password": self.config.sip_password,
                    }
                }
            }
        });
        if !template_context.is_empty() {
            payload["templateContext"] = json!(template_context);
        }
        self.create_agent_call(&payload).await
    }

    /// POSTs a call-creation payload to the agent calls endpoint.
    ///
    /// The platform answers 201 on success; any other status becomes
    /// `Rejected` with the upstream body preserved.
    async fn create_agent_call(
        &self,
        payload: &Value,
    ) -> Result<PlatformCallResponse, PlatformError> {
        let url = format!(
            "{}/agents/{}/calls",
            self.config.base_url.trim_end_matches('/'),
            self.config.agent_id
        );

        let response = self
            .http
            .post(&url)
            .header("X-API-Key", &self.config.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| PlatformError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.as_u16() != 201 {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "platform rejected call creation");
            return Err(PlatformError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;

        let created = PlatformCallResponse::from_raw(raw)?;
        tracing::debug!(call_id = %created.call_id, "platform call created");
        Ok(created)
    }

    /// Sends a user text message into a live session.
    ///
    /// The platform answers 200 or 201 depending on delivery timing; both
    /// mean accepted. Returns the platform's response body.
    pub async fn send_data_message(
        &self,
        call_id: &str,
        text: &str,
    ) -> Result<Value, PlatformError> {
        let url = format!(
            "{}/calls/{}/data-message",
            self.config.base_url.trim_end_matches('/'),
            call_id
        );
        let payload = json!({
            "type": "user_text_message",
            "text": text,
            "urgency": "soon",
        });

        let response = self
            .http
            .post(&url)
            .header("X-API-Key", &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PlatformError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))
    }

    /// Fetches the message transcript for a call.
    ///
    /// Returns the platform's `results` array (empty if the platform sent
    /// none).
    pub async fn list_messages(&self, call_id: &str) -> Result<Vec<Value>, PlatformError> {
        let url = format!(
            "{}/calls/{}/messages",
            self.config.base_url.trim_end_matches('/'),
            call_id
        );

        let response = self
            .http
            .get(&url)
            .header("X-API-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| PlatformError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;

        Ok(data
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Fetches the recording audio for a call.
    pub async fn fetch_recording(&self, call_id: &str) -> Result<Vec<u8>, PlatformError> {
        let url = format!(
            "{}/calls/{}/recording",
            self.config.base_url.trim_end_matches('/'),
            call_id
        );

        let response = self
            .http
            .get(&url)
            .header("X-API-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|e| PlatformError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PlatformError::Unavailable(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
