/**
 * Replicated Lock Events
 *
 * This module defines the events carried by the replication backplane.
 * Every coordinator instance publishes these when lock state changes and
 * re-emits the ones it receives to its own locally connected clients.
 *
 * Events are hints, not state: the shared lock store stays authoritative
 * and a client that misses one self-corrects on its next snapshot.
 */
use crate::shared::lock::{ConnectionId, ItemId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lock lifecycle event (one per backplane topic)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "topic", rename_all = "kebab-case")]
pub enum LockEvent {
    /// An item became locked
    LockGranted { item_id: ItemId, field: String },
    /// An item became unlocked (explicit release, reaper or lease expiry)
    LockReleased { item_id: ItemId },
    /// The owner typed a new unsaved value
    ContentChanged {
        item_id: ItemId,
        field: String,
        content: String,
    },
    /// The durable-storage collaborator persisted a change
    RefreshTableData,
}

impl LockEvent {
    /// Name of the backplane topic this event travels on
    pub fn topic(&self) -> &'static str {
        match self {
            Self::LockGranted { .. } => "lock-granted",
            Self::LockReleased { .. } => "lock-released",
            Self::ContentChanged { .. } => "content-changed",
            Self::RefreshTableData => "refresh-table-data",
        }
    }

    /// Item the event refers to, if any
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::LockGranted { item_id, .. }
            | Self::LockReleased { item_id }
            | Self::ContentChanged { item_id, .. } => Some(item_id),
            Self::RefreshTableData => None,
        }
    }
}

/// Envelope published on the backplane
///
/// `origin_connection` is excluded when an instance re-broadcasts the event,
/// so a user's own edit is never echoed back. Server-originated events
/// (lease expiry, refresh notifications) carry `None` and reach everyone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicatedEvent {
    /// Coordinator instance that published the event
    pub origin_instance: Uuid,
    /// Connection that caused the event
    pub origin_connection: Option<ConnectionId>,
    /// The event itself
    pub event: LockEvent,
    /// Timestamp when the event was published (RFC3339)
    pub timestamp: String,
}

impl ReplicatedEvent {
    /// Create a new envelope stamped with the current time
    pub fn new(
        origin_instance: Uuid,
        origin_connection: Option<ConnectionId>,
        event: LockEvent,
    ) -> Self {
        Self {
            origin_instance,
            origin_connection,
            event,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
