//! Port for structured transcript logging.
//!
//! Defines the [`ConversationLogger`] trait for recording session events
//! (submitted questions, completed answers, failures, cancellations) to a
//! structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the exchange
//! in a machine-readable format (JSONL).

use serde_json::Value;

pub const QUERY_SUBMITTED: &str = "query_submitted";
pub const RESPONSE_COMPLETED: &str = "response_completed";
pub const QUERY_FAILED: &str = "query_failed";
pub const QUERY_CANCELLED: &str = "query_cancelled";

/// A structured session event for logging.
///
/// The logger adds the timestamp when the event is written.
pub struct ConversationEvent {
    /// Event type identifier, one of the constants in this module.
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
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

/// Port for logging session events to a structured log.
///
/// `log` is synchronous and infallible; logging failures are ignored so a
/// broken log file never disturbs the exchange.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
