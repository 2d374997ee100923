/**
 * In-Memory Lock Store
 *
 * The degenerate single-instance case of the shared lock store: the map
 * lives in process memory behind one mutex, which makes every operation
 * trivially atomic.
 *
 * Clones share the same map, so several coordinators created in one
 * process (tests, or a single-binary deployment) observe one store.
 */

use crate::backend::store::{Claim, LockStore, StoreResult};
use crate::shared::lock::{ConnectionId, ItemId, LockRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Process-local lock store
#[derive(Debug, Clone, Default)]
pub struct MemoryLockStore {
    records: Arc<Mutex<HashMap<ItemId, LockRecord>>>,
}

impl MemoryLockStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn try_acquire(
        &self,
        item_id: &str,
        owner: ConnectionId,
        field: &str,
        content: &str,
    ) -> StoreResult<Claim> {
        let mut records = self.records.lock().await;
        match records.get_mut(item_id) {
            Some(record) if record.is_owned_by(owner) => {
                let changed = record.field != field || record.pending_content != content;
                record.field = field.to_string();
                record.pending_content = content.to_string();
                record.refreshed_at = Utc::now();
                Ok(Claim::Reclaimed { changed })
            }
            Some(_) => Ok(Claim::Denied),
            None => {
                records.insert(
                    item_id.to_string(),
                    LockRecord::new(item_id, owner, field, content),
                );
                Ok(Claim::Created)
            }
        }
    }

    async fn release(&self, item_id: &str, owner: ConnectionId) -> StoreResult<bool> {
        let mut records = self.records.lock().await;
        match records.get(item_id) {
            Some(record) if record.is_owned_by(owner) => {
                records.remove(item_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_content(
        &self,
        item_id: &str,
        owner: ConnectionId,
        field: &str,
        content: &str,
    ) -> StoreResult<bool> {
        let mut records = self.records.lock().await;
        match records.get_mut(item_id) {
            Some(record) if record.is_owned_by(owner) => {
                record.field = field.to_string();
                record.pending_content = content.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn snapshot(&self) -> StoreResult<BTreeSet<ItemId>> {
        Ok(self.records.lock().await.keys().cloned().collect())
    }

    async fn all_records(&self) -> StoreResult<Vec<LockRecord>> {
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn record(&self, item_id: &str) -> StoreResult<Option<LockRecord>> {
        Ok(self.records.lock().await.get(item_id).cloned())
    }

    async fn refresh(&self, owner: ConnectionId) -> StoreResult<usize> {
        let now = Utc::now();
        let mut records = self.records.lock().await;
        let mut refreshed = 0;
        for record in records.values_mut().filter(|r| r.is_owned_by(owner)) {
            record.refreshed_at = now;
            refreshed += 1;
        }
        Ok(refreshed)
    }

    async fn expire_stale(&self, ttl: Duration, now: DateTime<Utc>) -> StoreResult<Vec<LockRecord>> {
        let Some(cutoff) = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl))
        else {
            return Ok(Vec::new());
        };

        let mut records = self.records.lock().await;
        let stale: Vec<ItemId> = records
            .values()
            .filter(|r| r.is_stale(cutoff))
            .map(|r| r.item_id.clone())
            .collect();
        Ok(stale
            .iter()
            .filter_map(|item_id| records.remove(item_id))
            .collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
