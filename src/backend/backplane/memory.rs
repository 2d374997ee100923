/**
 * In-Memory Backplane
 *
 * Backplane built on `tokio::sync::broadcast`, a multi-producer,
 * multi-consumer channel where every subscriber receives a copy of each
 * event. Clones share the channel, so coordinators created from clones of
 * one `MemoryBackplane` behave like instances attached to one bus.
 */

use crate::backend::backplane::Backplane;
use crate::backend::error::BackplaneError;
use crate::shared::event::ReplicatedEvent;
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Process-local backplane
#[derive(Debug, Clone)]
pub struct MemoryBackplane {
    tx: broadcast::Sender<ReplicatedEvent>,
}

impl MemoryBackplane {
    /// Create a backplane buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Number of instances currently subscribed
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MemoryBackplane {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl Backplane for MemoryBackplane {
    async fn publish(&self, event: ReplicatedEvent) -> Result<(), BackplaneError> {
        let topic = event.event.topic();
        match self.tx.send(event) {
            Ok(subscriber_count) => {
                tracing::debug!(
                    "[Backplane] {} published to {} subscribers",
                    topic,
                    subscriber_count
                );
            }
            Err(_) => {
                // No subscribers, that's okay
                tracing::debug!("[Backplane] No subscribers to receive {}", topic);
            }
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ReplicatedEvent> {
        self.tx.subscribe()
    }
}
