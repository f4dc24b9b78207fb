//! Port for the structured loop transcript.
//!
//! Separate from `tracing`: tracing carries human-readable diagnostics,
//! this port records every cycle step (retrieval, tool call, critique,
//! result) in a machine-readable form such as JSONL.

use serde_json::Value;

/// A structured transcript event.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "tool_call", "critique", "budget_reset").
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Implementations write each event as one record. `log` is synchronous
/// and infallible; write failures are dropped.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when the transcript is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
