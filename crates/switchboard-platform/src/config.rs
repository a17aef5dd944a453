use serde::{Deserialize, Serialize};
use std::fmt;

fn default_base_url() -> String {
    "https://api.ultravox.ai/api".to_string()
}

fn default_webhook_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Configuration for the remote voice-agent platform.
#[derive(Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the platform API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API key sent in the `X-API-Key` header.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub api_key: String,

    /// The agent/template the platform answers calls with.
    #[serde(default)]
    pub agent_id: String,

    /// Public base URL the platform delivers lifecycle webhooks to.
    #[serde(default = "default_webhook_base_url")]
    pub webhook_base_url: String,

    /// Per-request timeout in seconds. Default: 30.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// SIP domain for outbound calls.
    #[serde(default)]
    pub sip_domain: String,

    /// SIP username for inbound/outbound call authentication.
    #[serde(default)]
    pub sip_username: String,

    /// SIP password for inbound/outbound call authentication.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub sip_password: String,

    /// Caller number for outbound SIP calls.
    #[serde(default)]
    pub sip_from_number: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            agent_id: String::new(),
            webhook_base_url: default_webhook_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            sip_domain: String::new(),
            sip_username: String::new(),
            sip_password: String::new(),
            sip_from_number: String::new(),
        }
    }
}

impl fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("agent_id", &self.agent_id)
            .field("webhook_base_url", &self.webhook_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("sip_domain", &self.sip_domain)
            .field("sip_username", &self.sip_username)
            .field("sip_password", &"[REDACTED]")
            .field("sip_from_number", &self.sip_from_number)
            .finish()
    }
}

impl PlatformConfig {
    /// Whether enough configuration is present to talk to the platform.
    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty() && !self.agent_id.is_empty()
    }

    /// The URL the platform should deliver lifecycle webhooks to.
    pub fn webhook_url(&self) -> String {
        format!("{}/webhook", self.webhook_base_url.trim_end_matches('/'))
    }
}
