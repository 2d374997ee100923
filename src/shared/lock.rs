/**
 * Edit Lock Data Structures
 *
 * This module defines the records that describe who is editing what.
 * A `LockRecord` is one in-progress edit claim on a single list item;
 * at most one exists per item at any time.
 *
 * The types are shared so that any client (or the out-of-scope CRUD
 * layer) can deserialize the lock views served by the backend.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a list item, assigned by the durable-storage collaborator
pub type ItemId = String;

/// Opaque identifier of one live client connection
///
/// A fresh id is generated for every accepted connection. It is the only
/// notion of identity the lock coordinator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a new random connection id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID (used when reading records back from a store)
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One in-progress edit claim
///
/// # Fields
/// * `item_id` - The item being edited
/// * `owner` - Connection currently holding the lock
/// * `field` - Attribute being edited (e.g. `title`), used for display
/// * `pending_content` - Latest unsaved value typed by the owner
/// * `acquired_at` - When the lock was first granted
/// * `refreshed_at` - Last lease heartbeat; records that stop being
///   refreshed are expired by the lease sweep
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LockRecord {
    pub item_id: ItemId,
    pub owner: ConnectionId,
    pub field: String,
    pub pending_content: String,
    pub acquired_at: DateTime<Utc>,
    pub refreshed_at: DateTime<Utc>,
}

impl LockRecord {
    /// Create a fresh record stamped with the current time
    pub fn new(
        item_id: impl Into<ItemId>,
        owner: ConnectionId,
        field: impl Into<String>,
        pending_content: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            item_id: item_id.into(),
            owner,
            field: field.into(),
            pending_content: pending_content.into(),
            acquired_at: now,
            refreshed_at: now,
        }
    }

    /// Whether `conn` is the recorded owner
    pub fn is_owned_by(&self, conn: ConnectionId) -> bool {
        self.owner == conn
    }

    /// Whether the lease heartbeat predates `cutoff`
    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.refreshed_at < cutoff
    }
}

/// Lock state of a single item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LockState {
    Unlocked,
    Locked { owner: ConnectionId, field: String },
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

impl From<Option<&LockRecord>> for LockState {
    fn from(record: Option<&LockRecord>) -> Self {
        match record {
            Some(record) => Self::Locked {
                owner: record.owner,
                field: record.field.clone(),
            },
            None => Self::Unlocked,
        }
    }
}
