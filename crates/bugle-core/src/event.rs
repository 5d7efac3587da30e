//! Fan-out event model.
//!
//! Events cross a process boundary twice: once as the broker envelope
//! published by mutation services, and once as the WebSocket frame the
//! gateway emits to clients. Both use the same adjacently tagged JSON
//! encoding, so the dispatcher forwards the event portion of an envelope
//! verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The single Pub/Sub channel every envelope is published to.
pub const NOTIFICATIONS_CHANNEL: &str = "notifications";

/// A change event fanned out to connected clients.
///
/// This is a closed set: an envelope carrying an unknown event name fails to
/// decode and is dropped by the subscriber instead of being forwarded as an
/// opaque string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum Event {
    /// A bug was created; carries the full bug record.
    BugCreated(Value),
    /// A bug was updated; carries the full updated record.
    BugUpdated(Value),
    /// A bug was deleted; only the id is re-sent.
    BugDeleted { id: String },
    /// A comment was added; carries the full comment record (with `bugId`).
    CommentAdded(Value),
    /// A comment was deleted.
    #[serde(rename_all = "camelCase")]
    CommentDeleted { bug_id: String, comment_id: String },
}

impl Event {
    /// Wire name of the event, as seen by clients.
    pub fn name(&self) -> &'static str {
        match self {
            Event::BugCreated(_) => "bug-created",
            Event::BugUpdated(_) => "bug-updated",
            Event::BugDeleted { .. } => "bug-deleted",
            Event::CommentAdded(_) => "comment-added",
            Event::CommentDeleted { .. } => "comment-deleted",
        }
    }
}

/// The unit of cross-process communication on the broker channel.
///
/// Immutable once published; there is no acknowledgement or delivery
/// receipt. `organization_id = None` broadcasts to every connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(flatten)]
    pub event: Event,
}
