//! Call, webhook, and tool-invocation record types.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a call.
///
/// The logical progression is `created → started → joined → ended`, but the
/// store never enforces it: any status may overwrite any other, because the
/// webhook channel delivering transitions is unordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// The call row exists; nothing has happened on the platform yet.
    Created,
    /// The platform reported `call.started`.
    Started,
    /// A participant joined the session.
    Joined,
    /// The session ended; terminal fields may be populated.
    Ended,
}

impl CallStatus {
    /// Returns the canonical string label stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Started => "started",
            Self::Joined => "joined",
            Self::Ended => "ended",
        }
    }
}

impl std::fmt::Display for CallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallStatus {
    type Err = ParseCallStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "started" => Ok(Self::Started),
            "joined" => Ok(Self::Joined),
            "ended" => Ok(Self::Ended),
            _ => Err(ParseCallStatusError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown call status string.
#[derive(Debug, Clone)]
pub struct ParseCallStatusError(pub String);

impl std::fmt::Display for ParseCallStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown call status: {}", self.0)
    }
}

impl std::error::Error for ParseCallStatusError {}

/// A tracked conversational session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Call {
    /// Internal database ID (creation-order tiebreak only).
    pub id: i64,
    /// Platform-assigned call identifier, immutable once set.
    pub call_id: String,
    /// The responding agent/template identifier.
    pub agent_id: String,
    /// Join/connection endpoint; empty for SIP/text-only sessions.
    pub join_url: Option<String>,
    /// Current lifecycle status (last write wins).
    pub status: CallStatus,
    /// Creation timestamp (ISO 8601), set once at insertion.
    pub created_at: String,
    /// Timestamp of the joined transition, set at most once.
    pub joined_at: Option<String>,
    /// Timestamp of the ended transition, set at most once.
    pub ended_at: Option<String>,
    /// Why the call ended, set only on the ended transition.
    pub end_reason: Option<String>,
    /// One-line summary, set only on the ended transition.
    pub short_summary: Option<String>,
    /// Full summary, set only on the ended transition.
    pub summary: Option<String>,
    /// Opaque key→value metadata supplied at creation, as JSON text.
    pub metadata: Option<String>,
    /// Platform creation response captured verbatim, for audit/debug.
    pub raw_response: Option<String>,
}

/// Parameters for creating a new call row.
#[derive(Debug, Clone, Default)]
pub struct NewCall {
    pub call_id: String,
    pub agent_id: String,
    pub join_url: String,
    /// Opaque metadata mapping; serialized to JSON text on insert.
    pub metadata: Option<serde_json::Value>,
    /// Platform response blob; serialized to JSON text on insert.
    pub raw_response: Option<serde_json::Value>,
}

/// Optional fields carried by a status transition.
///
/// Only fields that are `Some` reach the UPDATE statement; everything else
/// on the row is left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallStatusUpdate {
    pub joined_at: Option<String>,
    pub ended_at: Option<String>,
    pub end_reason: Option<String>,
    pub short_summary: Option<String>,
    pub summary: Option<String>,
}

/// A logged webhook event. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookEvent {
    /// Store-assigned, monotonically increasing sequence ID.
    pub id: i64,
    /// The call this event refers to (the row may predate the call).
    pub call_id: String,
    /// Event type string as received, e.g. `call.started`. Not whitelisted.
    pub event_type: String,
    /// Full received JSON body, stored verbatim.
    pub payload: String,
    /// Store-assigned receipt timestamp (ISO 8601).
    pub received_at: String,
}

/// A logged tool invocation. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    /// Store-assigned, monotonically increasing invocation ID.
    pub id: i64,
    /// The call this invocation belongs to.
    pub call_id: String,
    /// Which tool was invoked, e.g. `escalate_to_human`. Treated as opaque.
    pub tool_name: String,
    /// Tool-specific parameters as JSON text; schema is validated at the
    /// HTTP boundary, not here.
    pub parameters: String,
    /// Store-assigned invocation timestamp (ISO 8601).
    pub invoked_at: String,
}
