//! Lock Coordinator
//!
//! The protocol engine. It turns client requests into atomic operations on
//! the shared lock store, keeps the local connection registry in step, and
//! publishes replication events on the backplane.
//!
//! # Module Structure
//!
//! ```text
//! coordinator/
//! ├── mod.rs    - LockCoordinator and request dispatch
//! ├── reaper.rs - Disconnect reaper
//! └── lease.rs  - Lease heartbeat and stale-lock expiry
//! ```
//!
//! # Per-Item State Machine
//!
//! ```text
//!            acquire(conn)                    release(conn) / force-release(conn) / expiry
//! Unlocked ───────────────▶ Locked(conn) ─────────────────────────────────────────────▶ Unlocked
//!                            │      ▲
//!                            └──────┘ acquire(other): denied
//!                                     content update(conn): pendingContent refreshed
//! ```
//!
//! The state itself lives in the store. A denied acquire is final for that
//! attempt; nothing queues for a busy lock.

use crate::backend::backplane::Backplane;
use crate::backend::connection::ConnectionRegistry;
use crate::backend::error::{BackendError, BackplaneError, StoreError};
use crate::backend::store::{Claim, LockStore};
use crate::shared::event::{LockEvent, ReplicatedEvent};
use crate::shared::lock::{ConnectionId, ItemId, LockRecord, LockState};
use crate::shared::protocol::{ClientMessage, ServerMessage};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Disconnect reaper
pub mod reaper;

/// Lease heartbeat and expiry
pub mod lease;

pub use reaper::{reap_connection, ReapReport};

/// Tunables of the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// How long a record survives without a heartbeat
    pub lock_ttl: Duration,
    /// How often local leases are refreshed and stale ones swept
    pub refresh_interval: Duration,
    /// Whether the reaper also scans the store for the closing connection
    pub reap_scans_store: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(30),
            refresh_interval: Duration::from_secs(10),
            reap_scans_store: true,
        }
    }
}

/// Result of an acquire attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// The item was unlocked and now belongs to the requester
    Granted,
    /// The requester already held the lock
    AlreadyOwned,
    /// Another connection holds the lock
    Denied,
}

impl AcquireOutcome {
    pub fn is_owned(self) -> bool {
        matches!(self, Self::Granted | Self::AlreadyOwned)
    }
}

/// Per-instance lock coordinator
///
/// Cheap to clone; clones share the store, backplane and registry.
#[derive(Clone)]
pub struct LockCoordinator {
    instance_id: Uuid,
    store: Arc<dyn LockStore>,
    backplane: Arc<dyn Backplane>,
    registry: ConnectionRegistry,
    config: CoordinatorConfig,
}

impl std::fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("instance_id", &self.instance_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LockCoordinator {
    /// Create a coordinator instance with a fresh instance id
    pub fn new(
        store: Arc<dyn LockStore>,
        backplane: Arc<dyn Backplane>,
        registry: ConnectionRegistry,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            store,
            backplane,
            registry,
            config,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn LockStore> {
        &self.store
    }

    pub fn backplane(&self) -> &Arc<dyn Backplane> {
        &self.backplane
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Accept a new connection
    ///
    /// Registers it locally and queues the current lock snapshot as its
    /// first message, or an `error` when the store cannot produce one.
    /// Returns the connection id and its outbound queue.
    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        let conn = ConnectionId::new();
        let rx = self.registry.register(conn).await;
        tracing::info!("[Coordinator] Connection {} opened", conn);

        if let Err(e) = self.send_snapshot(conn).await {
            tracing::warn!("[Coordinator] Initial snapshot for {} failed: {}", conn, e);
            self.registry
                .send_to(conn, ServerMessage::error(None, format!("lock snapshot unavailable: {}", e)))
                .await;
        }
        (conn, rx)
    }

    /// Handle one client request
    ///
    /// Contention and ownership violations are normal outcomes. Only store
    /// failures are errors; the requester is told privately and the error
    /// is returned.
    pub async fn dispatch(&self, conn: ConnectionId, message: ClientMessage) -> Result<(), BackendError> {
        let item_id = message.item_id().map(str::to_string);
        let result = match message {
            ClientMessage::RequestLock { item_id, field, content } => {
                match self.acquire(conn, &item_id, &field, &content).await {
                    Ok(outcome) if outcome.is_owned() => {
                        self.registry
                            .send_to(conn, ServerMessage::LockAcquired { item_id, field })
                            .await;
                        Ok(())
                    }
                    Ok(_) => {
                        self.registry.send_to(conn, ServerMessage::LockDenied { item_id }).await;
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            ClientMessage::RequestUnlock { item_id } => {
                self.release(conn, &item_id).await.map(|_| ())
            }
            ClientMessage::EditContent { item_id, field, content } => {
                self.update_content(conn, &item_id, &field, &content).await.map(|_| ())
            }
            ClientMessage::QueryLocks => self.send_snapshot(conn).await,
        };

        if let Err(e) = result {
            tracing::error!("[Coordinator] Request from {} failed: {}", conn, e);
            self.registry
                .send_to(conn, ServerMessage::error(item_id.as_deref(), e.to_string()))
                .await;
            return Err(e.into());
        }
        Ok(())
    }

    /// `Unlocked --acquire(conn)--> Locked(conn)`
    ///
    /// Acquiring a lock one already owns succeeds without a new record or a
    /// second `lock-granted` event. If the re-acquire moves the lock to a new
    /// field or content, peers get `content-changed` instead.
    ///
    /// The outcome comes from the store alone: the local index may still
    /// list a lock that another instance has since expired.
    pub async fn acquire(
        &self,
        conn: ConnectionId,
        item_id: &str,
        field: &str,
        content: &str,
    ) -> Result<AcquireOutcome, StoreError> {
        let claim = self.store.try_acquire(item_id, conn, field, content).await?;
        if claim == Claim::Denied {
            tracing::debug!("[Coordinator] {} denied lock on {}", conn, item_id);
            return Ok(AcquireOutcome::Denied);
        }

        if !self.registry.record_lock(conn, item_id).await {
            // The connection closed while the claim was in flight and its
            // reaper may already have run.
            tracing::warn!(
                "[Coordinator] {} disconnected during acquire of {}, rolling back",
                conn,
                item_id
            );
            let released = self.store.release(item_id, conn).await?;
            if released && claim != Claim::Created {
                // Peers saw the earlier grant
                self.publish(
                    None,
                    LockEvent::LockReleased {
                        item_id: item_id.to_string(),
                    },
                )
                .await;
            }
            return Ok(AcquireOutcome::Denied);
        }

        match claim {
            Claim::Created => {
                tracing::info!("[Coordinator] {} locked {} ({})", conn, item_id, field);
                self.publish(
                    Some(conn),
                    LockEvent::LockGranted {
                        item_id: item_id.to_string(),
                        field: field.to_string(),
                    },
                )
                .await;
                Ok(AcquireOutcome::Granted)
            }
            Claim::Reclaimed { changed } => {
                if changed {
                    self.publish(
                        Some(conn),
                        LockEvent::ContentChanged {
                            item_id: item_id.to_string(),
                            field: field.to_string(),
                            content: content.to_string(),
                        },
                    )
                    .await;
                }
                Ok(AcquireOutcome::AlreadyOwned)
            }
            Claim::Denied => Ok(AcquireOutcome::Denied),
        }
    }

    /// `Locked(conn) --release(conn)--> Unlocked`
    ///
    /// Returns `false` (and changes nothing) when `conn` is not the owner.
    pub async fn release(&self, conn: ConnectionId, item_id: &str) -> Result<bool, StoreError> {
        if !self.store.release(item_id, conn).await? {
            tracing::debug!("[Coordinator] Ignoring release of {} by non-owner {}", item_id, conn);
            return Ok(false);
        }

        self.registry.forget_lock(conn, item_id).await;
        tracing::info!("[Coordinator] {} released {}", conn, item_id);
        self.publish(
            Some(conn),
            LockEvent::LockReleased {
                item_id: item_id.to_string(),
            },
        )
        .await;
        Ok(true)
    }

    /// `Locked(conn) --content update(conn)--> Locked(conn)`
    ///
    /// Updates from anyone but the owner are dropped silently.
    pub async fn update_content(
        &self,
        conn: ConnectionId,
        item_id: &str,
        field: &str,
        content: &str,
    ) -> Result<bool, StoreError> {
        if !self.store.update_content(item_id, conn, field, content).await? {
            tracing::debug!("[Coordinator] Dropping content update on {} from non-owner {}", item_id, conn);
            return Ok(false);
        }

        self.publish(
            Some(conn),
            LockEvent::ContentChanged {
                item_id: item_id.to_string(),
                field: field.to_string(),
                content: content.to_string(),
            },
        )
        .await;
        Ok(true)
    }

    /// Every currently locked item id
    pub async fn snapshot(&self) -> Result<BTreeSet<ItemId>, StoreError> {
        self.store.snapshot().await
    }

    /// The lock record of one item, including its pending content
    pub async fn record(&self, item_id: &str) -> Result<Option<LockRecord>, StoreError> {
        self.store.record(item_id).await
    }

    /// Current state of one item
    pub async fn lock_state(&self, item_id: &str) -> Result<LockState, StoreError> {
        Ok(LockState::from(self.store.record(item_id).await?.as_ref()))
    }

    /// Tell every client on every instance to reload persisted data
    pub async fn notify_refresh(&self) -> Result<(), BackplaneError> {
        tracing::info!("[Coordinator] Broadcasting refresh-table-data");
        self.backplane
            .publish(ReplicatedEvent::new(self.instance_id, None, LockEvent::RefreshTableData))
            .await
    }

    /// Close a connection and run the disconnect reaper for it
    pub async fn disconnect(&self, conn: ConnectionId) -> ReapReport {
        tracing::info!("[Coordinator] Connection {} closed", conn);
        reap_connection(
            &self.registry,
            self.store.as_ref(),
            self.backplane.as_ref(),
            self.instance_id,
            conn,
            self.config.reap_scans_store,
        )
        .await
    }

    async fn send_snapshot(&self, conn: ConnectionId) -> Result<(), StoreError> {
        let item_ids = self.snapshot().await?.into_iter().collect();
        self.registry
            .send_to(conn, ServerMessage::InitializeLocks { item_ids })
            .await;
        Ok(())
    }

    /// Publish an event; failures are logged, never propagated
    ///
    /// The store has already changed by the time this runs, and clients
    /// recover missed events from the next snapshot.
    async fn publish(&self, origin: Option<ConnectionId>, event: LockEvent) -> bool {
        let topic = event.topic();
        match self
            .backplane
            .publish(ReplicatedEvent::new(self.instance_id, origin, event))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("[Coordinator] Failed to publish {}: {}", topic, e);
                false
            }
        }
    }
}
