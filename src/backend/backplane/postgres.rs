/**
 * PostgreSQL Backplane
 *
 * Fans events out between instances with `LISTEN`/`NOTIFY` on the same
 * database that hosts the lock store. Publishing is a single `pg_notify`
 * call; a background task owns a `PgListener`, decodes every notification
 * and forwards it into a local broadcast channel that `subscribe` hands out.
 *
 * # Delivery
 *
 * `PgListener` reconnects on its own after a dropped connection.
 * Notifications sent while it is disconnected are lost, which the
 * best-effort contract allows.
 */

use crate::backend::backplane::Backplane;
use crate::backend::error::BackplaneError;
use crate::shared::event::ReplicatedEvent;
use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Notification channel shared by every instance
pub const NOTIFY_CHANNEL: &str = "listlock_events";

/// PostgreSQL rejects NOTIFY payloads of 8000 bytes or more
pub const MAX_PAYLOAD_BYTES: usize = 7999;

/// Aborts the listener task once the last backplane clone is dropped
#[derive(Debug)]
struct ListenerTask(JoinHandle<()>);

impl Drop for ListenerTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Backplane over PostgreSQL LISTEN/NOTIFY
#[derive(Debug, Clone)]
pub struct PgBackplane {
    pool: PgPool,
    tx: broadcast::Sender<ReplicatedEvent>,
    _listener: Arc<ListenerTask>,
}

impl PgBackplane {
    /// Start listening on `NOTIFY_CHANNEL`
    pub async fn connect(pool: PgPool, capacity: usize) -> Result<Self, BackplaneError> {
        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(NOTIFY_CHANNEL).await?;
        tracing::info!("[Backplane] Listening on PostgreSQL channel {}", NOTIFY_CHANNEL);

        let (tx, _) = broadcast::channel(capacity.max(1));
        let forward = tx.clone();
        let handle = tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        match serde_json::from_str::<ReplicatedEvent>(notification.payload()) {
                            Ok(event) => {
                                // No local subscribers is fine
                                let _ = forward.send(event);
                            }
                            Err(e) => {
                                tracing::warn!("[Backplane] Dropping undecodable notification: {}", e);
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("[Backplane] Listener error, reconnecting: {}", e);
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            }
        });

        Ok(Self {
            pool,
            tx,
            _listener: Arc::new(ListenerTask(handle)),
        })
    }
}

/// Encode an envelope as a NOTIFY payload
pub fn encode_payload(event: &ReplicatedEvent) -> Result<String, BackplaneError> {
    let payload = serde_json::to_string(event)?;
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(BackplaneError::PayloadTooLarge {
            size: payload.len(),
            limit: MAX_PAYLOAD_BYTES,
        });
    }
    Ok(payload)
}

#[async_trait]
impl Backplane for PgBackplane {
    async fn publish(&self, event: ReplicatedEvent) -> Result<(), BackplaneError> {
        let payload = encode_payload(&event)?;
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(NOTIFY_CHANNEL)
            .bind(payload)
            .execute(&self.pool)
            .await?;

        tracing::debug!("[Backplane] {} published via NOTIFY", event.event.topic());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ReplicatedEvent> {
        self.tx.subscribe()
    }
}
