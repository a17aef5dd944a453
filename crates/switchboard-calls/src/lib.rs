//! Call-lifecycle tracking core for the switchboard service.
//!
//! Tracks voice/text conversational sessions ("calls") driven by
//! asynchronous lifecycle webhooks from the remote voice-agent platform.
//! Three entities are persisted:
//!
//! - **calls** — one row per session, keyed by the platform-assigned
//!   `call_id`, carrying current status and terminal fields.
//! - **webhooks** — an append-only log of every lifecycle event received,
//!   written before any other processing so a downstream failure never
//!   loses the raw event.
//! - **tool_invocations** — an append-only log of agent-initiated
//!   side-channel actions (escalation, engagement scoring), each tied to
//!   an existing call.
//!
//! The status field is deliberately a plain last-write-wins enum rather
//! than a guarded automaton: the upstream delivery channel is unordered
//! and at-least-once, so a strict transition check could wedge on valid
//! late-arriving events.

mod call;
mod error;
mod registry;
mod store;

#[cfg(test)]
mod tests;

pub use call::{Call, CallStatus, CallStatusUpdate, NewCall, ToolInvocation, WebhookEvent};
pub use error::CallError;
pub use registry::{apply_webhook, WebhookDisposition, WebhookEnvelope};
pub use store::{
    create_call, get_call, get_tool_invocations_for_call, get_webhooks_for_call,
    list_calls, log_tool_invocation, log_webhook, update_call_status,
};
