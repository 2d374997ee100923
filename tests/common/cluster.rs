//! Multi-instance test fixtures
//!
//! A `Cluster` is several coordinators in one process sharing a store and a
//! backplane, each with its own registry and relay, the same shape as a
//! multi-instance deployment behind a load balancer.

use listlock::backend::backplane::MemoryBackplane;
use listlock::backend::coordinator::{CoordinatorConfig, LockCoordinator};
use listlock::backend::connection::ConnectionRegistry;
use listlock::backend::realtime::spawn_relay;
use listlock::backend::store::{LockStore, MemoryLockStore};
use listlock::shared::lock::{ConnectionId, ItemId};
use listlock::shared::protocol::{ClientMessage, ServerMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

/// How long a client waits for an expected message
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a client listens before concluding nothing is coming
pub const QUIET_PERIOD: Duration = Duration::from_millis(100);

/// Coordinator instances sharing one store and one backplane
pub struct Cluster {
    pub store: Arc<dyn LockStore>,
    pub backplane: MemoryBackplane,
    pub instances: Vec<LockCoordinator>,
    relays: Vec<JoinHandle<()>>,
}

impl Cluster {
    /// `n` instances over an in-memory store
    pub fn new(n: usize) -> Self {
        Self::with_store(n, Arc::new(MemoryLockStore::new()), CoordinatorConfig::default())
    }

    /// `n` instances over `store`
    pub fn with_store(n: usize, store: Arc<dyn LockStore>, config: CoordinatorConfig) -> Self {
        let backplane = MemoryBackplane::new(256);
        let mut instances = Vec::with_capacity(n);
        let mut relays = Vec::with_capacity(n);

        for _ in 0..n {
            let coordinator = LockCoordinator::new(
                store.clone(),
                Arc::new(backplane.clone()),
                ConnectionRegistry::new(),
                config.clone(),
            );
            relays.push(spawn_relay(&backplane, coordinator.registry().clone()));
            instances.push(coordinator);
        }

        Self {
            store,
            backplane,
            instances,
            relays,
        }
    }

    pub fn instance(&self, index: usize) -> &LockCoordinator {
        &self.instances[index]
    }

    /// Connect a new client to instance `index`
    pub async fn connect(&self, index: usize) -> TestClient {
        TestClient::connect(self.instance(index)).await
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        for relay in &self.relays {
            relay.abort();
        }
    }
}

/// A connected client: its id, its coordinator and its outbound queue
pub struct TestClient {
    pub id: ConnectionId,
    pub coordinator: LockCoordinator,
    pub initial_locks: Vec<ItemId>,
    rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl TestClient {
    /// Connect and consume the initial lock snapshot
    pub async fn connect(coordinator: &LockCoordinator) -> Self {
        let (id, mut rx) = coordinator.connect().await;
        let initial_locks = match timeout(RECV_TIMEOUT, rx.recv()).await {
            Ok(Some(ServerMessage::InitializeLocks { item_ids })) => item_ids,
            other => panic!("Expected initialize-locks on connect, got {:?}", other),
        };

        Self {
            id,
            coordinator: coordinator.clone(),
            initial_locks,
            rx,
        }
    }

    /// Send a request as this client
    pub async fn send(&self, message: ClientMessage) {
        // Store failures are reported to the client as an error message
        let _ = self.coordinator.dispatch(self.id, message).await;
    }

    pub async fn request_lock(&self, item_id: &str, field: &str, content: &str) {
        self.send(ClientMessage::RequestLock {
            item_id: item_id.to_string(),
            field: field.to_string(),
            content: content.to_string(),
        })
        .await;
    }

    pub async fn request_unlock(&self, item_id: &str) {
        self.send(ClientMessage::RequestUnlock {
            item_id: item_id.to_string(),
        })
        .await;
    }

    pub async fn edit(&self, item_id: &str, field: &str, content: &str) {
        self.send(ClientMessage::EditContent {
            item_id: item_id.to_string(),
            field: field.to_string(),
            content: content.to_string(),
        })
        .await;
    }

    /// Wait for the next message
    pub async fn next(&mut self) -> ServerMessage {
        match timeout(RECV_TIMEOUT, self.rx.recv()).await {
            Ok(Some(message)) => message,
            Ok(None) => panic!("Outbound queue of {} closed", self.id),
            Err(_) => panic!("No message for {} within {:?}", self.id, RECV_TIMEOUT),
        }
    }

    /// Assert that nothing arrives for a while
    pub async fn assert_silent(&mut self) {
        if let Ok(Some(message)) = timeout(QUIET_PERIOD, self.rx.recv()).await {
            panic!("Expected no message for {}, got {:?}", self.id, message);
        }
    }

    /// Close the connection and run the reaper
    pub async fn disconnect(self) -> listlock::backend::coordinator::ReapReport {
        self.coordinator.disconnect(self.id).await
    }
}
