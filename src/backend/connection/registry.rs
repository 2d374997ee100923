/**
 * Connection Registry
 *
 * Per-instance table of live client connections. Each entry owns the
 * sending half of the connection's outbound queue and the set of items the
 * connection currently holds locks for.
 *
 * The held-item sets are a derived, local view of the shared lock store.
 * They exist so the disconnect reaper knows where to start without a
 * store-wide scan; the store remains authoritative.
 *
 * # Thread Safety
 *
 * The table is `Arc<RwLock<HashMap<..>>>`; clones share it. Outbound queues
 * are unbounded so delivering a message never awaits a slow client.
 */

use crate::shared::lock::{ConnectionId, ItemId};
use crate::shared::protocol::ServerMessage;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// One live connection
#[derive(Debug)]
pub struct ConnectionEntry {
    /// Outbound message queue, drained by the connection's writer task
    outbound: mpsc::UnboundedSender<ServerMessage>,
    /// Items this connection holds locks for
    held: HashSet<ItemId>,
    /// When the connection was accepted
    connected_at: DateTime<Utc>,
}

impl ConnectionEntry {
    pub fn held(&self) -> &HashSet<ItemId> {
        &self.held
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }
}

/// Live connections of this instance
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<ConnectionId, ConnectionEntry>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and return the receiving half of its queue
    pub async fn register(&self, conn: ConnectionId) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (outbound, rx) = mpsc::unbounded_channel();
        let entry = ConnectionEntry {
            outbound,
            held: HashSet::new(),
            connected_at: Utc::now(),
        };
        self.connections.write().await.insert(conn, entry);
        tracing::debug!("[Registry] Registered connection {}", conn);
        rx
    }

    /// Remove a connection, returning the items it was recorded as holding
    ///
    /// Returns `None` if the connection was already gone.
    pub async fn unregister(&self, conn: ConnectionId) -> Option<HashSet<ItemId>> {
        let entry = self.connections.write().await.remove(&conn)?;
        tracing::debug!(
            "[Registry] Unregistered connection {} holding {} locks",
            conn,
            entry.held.len()
        );
        Some(entry.held)
    }

    /// Record that `conn` now holds `item_id`
    ///
    /// Returns `false` if the connection is not registered.
    pub async fn record_lock(&self, conn: ConnectionId, item_id: &str) -> bool {
        match self.connections.write().await.get_mut(&conn) {
            Some(entry) => {
                entry.held.insert(item_id.to_string());
                true
            }
            None => false,
        }
    }

    /// Forget that `conn` holds `item_id`
    pub async fn forget_lock(&self, conn: ConnectionId, item_id: &str) -> bool {
        match self.connections.write().await.get_mut(&conn) {
            Some(entry) => entry.held.remove(item_id),
            None => false,
        }
    }

    /// Whether `conn` is recorded as holding `item_id`
    pub async fn holds(&self, conn: ConnectionId, item_id: &str) -> bool {
        self.connections
            .read()
            .await
            .get(&conn)
            .is_some_and(|entry| entry.held.contains(item_id))
    }

    /// Items `conn` is recorded as holding
    pub async fn held_by(&self, conn: ConnectionId) -> HashSet<ItemId> {
        self.connections
            .read()
            .await
            .get(&conn)
            .map(|entry| entry.held.clone())
            .unwrap_or_default()
    }

    /// Local connection recorded as holding `item_id`, if any
    pub async fn owner_of(&self, item_id: &str) -> Option<ConnectionId> {
        self.connections
            .read()
            .await
            .iter()
            .find(|(_, entry)| entry.held.contains(item_id))
            .map(|(conn, _)| *conn)
    }

    /// Queue a message for one connection
    ///
    /// Returns `false` if the connection is gone or its writer has stopped.
    pub async fn send_to(&self, conn: ConnectionId, message: ServerMessage) -> bool {
        match self.connections.read().await.get(&conn) {
            Some(entry) => entry.outbound.send(message).is_ok(),
            None => false,
        }
    }

    /// Queue a message for every connection except `origin`
    ///
    /// Returns the number of connections the message was queued for.
    pub async fn broadcast_except(
        &self,
        origin: Option<ConnectionId>,
        message: &ServerMessage,
    ) -> usize {
        let connections = self.connections.read().await;
        connections
            .iter()
            .filter(|(conn, _)| Some(**conn) != origin)
            .filter(|(_, entry)| entry.outbound.send(message.clone()).is_ok())
            .count()
    }

    /// Ids of every registered connection
    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.read().await.keys().copied().collect()
    }

    /// Number of registered connections
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
