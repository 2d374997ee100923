//! Replication Backplane
//!
//! Publish/subscribe channel shared by every coordinator instance. Each
//! instance publishes lock, unlock and content events here and subscribes
//! once at startup to re-emit what it receives to its own clients.
//!
//! # Module Structure
//!
//! ```text
//! backplane/
//! ├── mod.rs      - Backplane trait
//! ├── memory.rs   - tokio broadcast channel (single process)
//! └── postgres.rs - PostgreSQL LISTEN/NOTIFY (multi-instance)
//! ```
//!
//! # Delivery
//!
//! At-most-once, best effort, unordered. The shared lock store stays the
//! source of truth; events only tell clients that something changed.

use crate::backend::error::BackplaneError;
use crate::shared::event::ReplicatedEvent;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// tokio broadcast backplane
pub mod memory;

/// PostgreSQL LISTEN/NOTIFY backplane
pub mod postgres;

pub use memory::MemoryBackplane;
pub use postgres::PgBackplane;

/// Fan-out channel between coordinator instances
#[async_trait]
pub trait Backplane: Send + Sync {
    /// Publish an event to every subscribed instance, including this one
    async fn publish(&self, event: ReplicatedEvent) -> Result<(), BackplaneError>;

    /// Receive every event published from now on
    fn subscribe(&self) -> broadcast::Receiver<ReplicatedEvent>;
}
