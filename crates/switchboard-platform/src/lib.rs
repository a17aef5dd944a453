//! HTTP client for the remote voice-agent platform.
//!
//! The platform originates calls and delivers lifecycle webhooks; this crate
//! covers the outbound half: creating agent calls (WebRTC or SIP), fetching
//! call transcripts, and fetching recordings. Every request carries a
//! bounded timeout, and failures are split into two kinds so callers can
//! pick a retry policy:
//!
//! - [`PlatformError::Unavailable`] — timeout or connection failure; the
//!   platform never produced a response.
//! - [`PlatformError::Rejected`] — the platform answered with a non-2xx
//!   status; the upstream status and body are preserved for passthrough.

mod client;
mod config;
mod error;

pub use client::{PlatformCallResponse, PlatformClient};
pub use config::PlatformConfig;
pub use error::PlatformError;
