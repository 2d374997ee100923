/**
 * Lease Maintenance
 *
 * Second line of defense behind the disconnect reaper. An instance that
 * crashes never reaps its own connections, and no other instance can see
 * those connections die. So every record carries a lease heartbeat:
 *
 * - each instance refreshes the records held by its live connections every
 *   `refresh_interval`;
 * - each instance sweeps the store for records not refreshed within
 *   `lock_ttl` and treats them as force-released.
 *
 * Expiry publishes `lock-released` with no origin connection, so it looks
 * exactly like a normal release to every client.
 */

use crate::backend::coordinator::LockCoordinator;
use crate::backend::error::StoreError;
use crate::shared::event::{LockEvent, ReplicatedEvent};
use crate::shared::lock::LockRecord;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

impl LockCoordinator {
    /// Heartbeat the records of every local connection that holds locks
    ///
    /// Returns the number of records refreshed. Store failures are logged;
    /// a missed heartbeat only matters if it persists for a whole TTL.
    pub async fn refresh_leases(&self) -> usize {
        let mut refreshed = 0;
        for conn in self.registry.connection_ids().await {
            if self.registry.held_by(conn).await.is_empty() {
                continue;
            }
            match self.store.refresh(conn).await {
                Ok(count) => refreshed += count,
                Err(e) => {
                    tracing::warn!("[Lease] Heartbeat for {} failed: {}", conn, e);
                }
            }
        }
        refreshed
    }

    /// Expire every record whose heartbeat is older than `lock_ttl`
    ///
    /// `now` only applies to stores without a clock of their own; the
    /// Postgres store ages records against the database clock.
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> Result<Vec<LockRecord>, StoreError> {
        let expired = self.store.expire_stale(self.config.lock_ttl, now).await?;
        for record in &expired {
            tracing::warn!(
                "[Lease] Lock on {} held by {} expired (last heartbeat {})",
                record.item_id,
                record.owner,
                record.refreshed_at
            );
            self.registry.forget_lock(record.owner, &record.item_id).await;

            let event = ReplicatedEvent::new(
                self.instance_id,
                None,
                LockEvent::LockReleased {
                    item_id: record.item_id.clone(),
                },
            );
            if let Err(e) = self.backplane.publish(event).await {
                tracing::warn!("[Lease] Failed to publish expiry of {}: {}", record.item_id, e);
            }
        }
        Ok(expired)
    }

    /// Run heartbeat and sweep every `refresh_interval` until aborted
    pub fn spawn_lease_maintenance(&self) -> JoinHandle<()> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(coordinator.config.refresh_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let refreshed = coordinator.refresh_leases().await;
                match coordinator.expire_stale(Utc::now()).await {
                    Ok(expired) => {
                        tracing::debug!(
                            "[Lease] Refreshed {} leases, expired {} stale locks",
                            refreshed,
                            expired.len()
                        );
                    }
                    Err(e) => {
                        tracing::warn!("[Lease] Stale lock sweep failed: {}", e);
                    }
                }
            }
        })
    }
}
