use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    /// The platform could not be reached (timeout or connection failure).
    #[error("voice platform unreachable: {0}")]
    Unavailable(String),

    /// The platform answered with a non-2xx status.
    #[error("voice platform rejected the request ({status}): {body}")]
    Rejected {
        /// The upstream HTTP status code.
        status: u16,
        /// The upstream response body, preserved for diagnosis.
        body: String,
    },

    /// A 2xx response was missing a field the caller requires.
    #[error("voice platform response missing field: {0}")]
    MissingField(&'static str),

    /// A 2xx response body could not be decoded as JSON.
    #[error("invalid platform response body: {0}")]
    Decode(String),

    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}
