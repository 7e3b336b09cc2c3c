//! Engine event stream.
//!
//! Every externally observable state change is published as an
//! [`EngineEvent`] through the injected [`NotificationSink`]. Events are
//! serde-tagged with snake_case names so a sink can forward them onto a
//! wire as-is.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An engine lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A discovery cycle started for a user.
    SearchStarted { user_id: String },
    /// An adapter (or the whole fan-out) reported results.
    SearchProgress {
        user_id: String,
        found: usize,
        warnings: Vec<String>,
    },
    /// An application attempt was created and queued.
    ApplicationStarted {
        user_id: String,
        attempt_id: String,
        posting_url: String,
    },
    /// An attempt changed state mid-flight.
    ApplicationProgress {
        user_id: String,
        attempt_id: String,
        state: String,
    },
    /// An attempt reached a terminal state.
    ApplicationCompleted {
        user_id: String,
        attempt_id: String,
        state: String,
        failure_reason: Option<String>,
        confirmation: Option<String>,
    },
    /// Something went wrong outside any single attempt.
    Error {
        user_id: Option<String>,
        message: String,
    },
}

/// Destination for engine events.
///
/// Sinks must not block the engine; slow consumers should buffer
/// internally. Publishing is fire-and-forget — a sink failure is the
/// sink's problem.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn publish(&self, event: EngineEvent);
}

/// Sink that drops every event.
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn publish(&self, _event: EngineEvent) {}
}
