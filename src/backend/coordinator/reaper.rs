/**
 * Disconnect Reaper
 *
 * Runs whenever a connection closes, whether the client said goodbye, timed
 * out or vanished with the network. It force-releases every lock the
 * connection still holds and publishes `lock-released` for each, so a
 * crashed tab can never leave an item locked forever.
 *
 * # Finding the Locks
 *
 * The starting set is the connection's entry in the local registry. When
 * `scan_store` is set, the reaper also scans `all_records()` for records
 * owned by the connection, which catches claims the local index missed.
 *
 * # Releasing
 *
 * Each release is the store's ownership-gated delete, so a lock that was
 * already reassigned to someone else is never touched. A store failure on
 * one item does not stop the others; those locks are left to lease expiry.
 */

use crate::backend::backplane::Backplane;
use crate::backend::connection::ConnectionRegistry;
use crate::backend::store::LockStore;
use crate::shared::event::{LockEvent, ReplicatedEvent};
use crate::shared::lock::{ConnectionId, ItemId};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Outcome of reaping one connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Items whose lock was deleted by the reaper
    pub released: Vec<ItemId>,
    /// Items the store could not release
    pub failed: Vec<ItemId>,
}

impl ReapReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Unregister `conn` and force-release every lock it holds
pub async fn reap_connection(
    registry: &ConnectionRegistry,
    store: &dyn LockStore,
    backplane: &dyn Backplane,
    instance_id: Uuid,
    conn: ConnectionId,
    scan_store: bool,
) -> ReapReport {
    let mut candidates: BTreeSet<ItemId> = registry
        .unregister(conn)
        .await
        .unwrap_or_default()
        .into_iter()
        .collect();

    if scan_store {
        match store.all_records().await {
            Ok(records) => candidates.extend(
                records
                    .into_iter()
                    .filter(|record| record.is_owned_by(conn))
                    .map(|record| record.item_id),
            ),
            Err(e) => {
                tracing::warn!(
                    "[Reaper] Store scan for {} failed, reaping local index only: {}",
                    conn,
                    e
                );
            }
        }
    }

    let mut report = ReapReport::default();
    for item_id in candidates {
        match store.release(&item_id, conn).await {
            Ok(true) => {
                let event = ReplicatedEvent::new(
                    instance_id,
                    Some(conn),
                    LockEvent::LockReleased {
                        item_id: item_id.clone(),
                    },
                );
                if let Err(e) = backplane.publish(event).await {
                    tracing::warn!("[Reaper] Failed to publish release of {}: {}", item_id, e);
                }
                report.released.push(item_id);
            }
            Ok(false) => {
                tracing::debug!("[Reaper] {} no longer held by {}", item_id, conn);
            }
            Err(e) => {
                tracing::error!("[Reaper] Failed to release {} held by {}: {}", item_id, conn, e);
                report.failed.push(item_id);
            }
        }
    }

    if !report.released.is_empty() || !report.failed.is_empty() {
        tracing::info!(
            "[Reaper] Connection {}: released {} locks, {} left to expiry",
            conn,
            report.released.len(),
            report.failed.len()
        );
    }
    report
}
