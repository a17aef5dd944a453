use thiserror::Error;

/// Errors that can occur during call-tracking operations.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A call with this `call_id` already exists.
    #[error("call already exists: {0}")]
    Duplicate(String),

    /// The referenced `call_id` does not exist where existence is required.
    #[error("call not found: {0}")]
    NotFound(String),

    /// An inbound webhook payload is missing a required field.
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
