//! The progress event envelope and the fixed event vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named events emitted over a run's progress stream.
///
/// Kept as string constants (not an enum) so the stream vocabulary can grow
/// without breaking subscribers that pattern-match on names they know.
pub mod names {
    /// Sent once per subscription, before any pipeline event.
    pub const HELLO: &str = "hello";
    /// Keep-alive marker defeating idle-connection timeouts. Framed as an
    /// SSE comment (`: ping`), never as a named event.
    pub const PING: &str = "ping";
    pub const CHUNK_START: &str = "chunk_start";
    pub const PRODUCT_START: &str = "product_start";
    pub const PROMPT_REQUEST: &str = "prompt_request";
    pub const PROMPT_RECEIVED: &str = "prompt_received";
    /// Truncated preview of generated text for one product.
    pub const PROMPT_OUTPUT: &str = "prompt_output";
    pub const PROMPT_ERROR: &str = "prompt_error";
    pub const DB_UPDATE_START: &str = "db_update_start";
    pub const DB_UPDATE_DONE: &str = "db_update_done";
    pub const DB_UPDATE_ERROR: &str = "db_update_error";
    pub const DB_RELATED_UPDATE: &str = "db_related_update";
    pub const PRODUCT_DONE: &str = "product_done";
    /// Aggregate totals snapshot after each product.
    pub const TOTALS_UPDATE: &str = "totals_update";
}

/// One framed progress message for a run's observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Event name from [`names`].
    pub event: String,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Create a new event with an empty payload.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
