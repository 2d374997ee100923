//! Shared Lock Store
//!
//! The shared lock store is the single authority on which items are locked
//! and by whom. Every coordinator instance talks to the same store, so all
//! per-item transitions are serialized by its atomic primitives.
//!
//! # Module Structure
//!
//! ```text
//! store/
//! ├── mod.rs      - LockStore trait
//! ├── memory.rs   - In-process adapter (single instance, tests)
//! └── postgres.rs - PostgreSQL adapter (multi-instance)
//! ```
//!
//! # Atomicity
//!
//! Each operation is a single atomic step. Adapters never read a record and
//! then write it back without re-checking ownership in the write itself.

use crate::backend::error::StoreError;
use crate::shared::lock::{ConnectionId, ItemId, LockRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::time::Duration;

/// In-process adapter
pub mod memory;

/// PostgreSQL adapter
pub mod postgres;

pub use memory::MemoryLockStore;
pub use postgres::PgLockStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of `LockStore::try_acquire`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// No record existed; one now belongs to the caller
    Created,
    /// The caller already held the record and it was retagged.
    /// `changed` is set when the field or content differs from before.
    Reclaimed { changed: bool },
    /// Another connection holds the record
    Denied,
}

impl Claim {
    /// Whether the caller holds the lock afterwards
    pub fn is_held(self) -> bool {
        !matches!(self, Self::Denied)
    }
}

/// Key/value map from item id to lock record, shared by all instances
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Create the record iff none exists for `item_id`
    ///
    /// A request from the current owner succeeds again without creating a
    /// second record; it retags the field and content but keeps
    /// `acquired_at`. The returned `Claim` tells the two apart, so callers
    /// never have to guess from local state.
    async fn try_acquire(
        &self,
        item_id: &str,
        owner: ConnectionId,
        field: &str,
        content: &str,
    ) -> StoreResult<Claim>;

    /// Delete the record iff it exists and is owned by `owner`
    async fn release(&self, item_id: &str, owner: ConnectionId) -> StoreResult<bool>;

    /// Replace the pending content of a record owned by `owner`
    async fn update_content(
        &self,
        item_id: &str,
        owner: ConnectionId,
        field: &str,
        content: &str,
    ) -> StoreResult<bool>;

    /// All currently locked item ids
    async fn snapshot(&self) -> StoreResult<BTreeSet<ItemId>>;

    /// Every record in the store
    async fn all_records(&self) -> StoreResult<Vec<LockRecord>>;

    /// The record for one item, if locked
    async fn record(&self, item_id: &str) -> StoreResult<Option<LockRecord>>;

    /// Bump the lease heartbeat of every record owned by `owner`
    ///
    /// Returns the number of records refreshed.
    async fn refresh(&self, owner: ConnectionId) -> StoreResult<usize>;

    /// Delete every record whose heartbeat is older than `ttl`
    ///
    /// `now` is the caller's clock. A store that stamps heartbeats with its
    /// own clock measures the age against that clock instead, so a skewed
    /// instance cannot expire live locks. Returns the deleted records.
    async fn expire_stale(&self, ttl: Duration, now: DateTime<Utc>) -> StoreResult<Vec<LockRecord>>;

    /// Check that the store is reachable
    async fn health_check(&self) -> StoreResult<()>;
}
