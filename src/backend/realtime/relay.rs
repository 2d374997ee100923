/**
 * Backplane Relay
 *
 * Each instance runs exactly one relay task. It consumes every event from
 * the backplane (including the ones this instance published) and queues the
 * matching `ServerMessage` for each local connection, skipping the
 * connection that caused the event so users never see their own edits
 * echoed back.
 *
 * Local delivery goes through the relay only; coordinators never write
 * broadcasts to their own clients directly, so an event reaches each client
 * at most once.
 */

use crate::backend::backplane::Backplane;
use crate::backend::connection::ConnectionRegistry;
use crate::shared::event::ReplicatedEvent;
use crate::shared::protocol::ServerMessage;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Subscribe to `backplane` now and relay its events to `registry`
pub fn spawn_relay(backplane: &dyn Backplane, registry: ConnectionRegistry) -> JoinHandle<()> {
    let events = BroadcastStream::new(backplane.subscribe());
    tokio::spawn(relay_events(events, registry))
}

/// Relay until the backplane channel closes
pub async fn relay_events(mut events: BroadcastStream<ReplicatedEvent>, registry: ConnectionRegistry) {
    tracing::info!("[Relay] Relaying backplane events to local connections");

    while let Some(item) = events.next().await {
        match item {
            Ok(envelope) => {
                let topic = envelope.event.topic();
                let message = ServerMessage::from(envelope.event);
                let delivered = registry
                    .broadcast_except(envelope.origin_connection, &message)
                    .await;
                tracing::debug!("[Relay] {} delivered to {} local connections", topic, delivered);
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                // Clients recover from the next snapshot
                tracing::warn!("[Relay] Receiver lagged, skipped {} events", skipped);
            }
        }
    }

    tracing::warn!("[Relay] Backplane channel closed, relay stopped");
}
