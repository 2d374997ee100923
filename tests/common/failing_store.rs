//! Lock store with a failure switch
//!
//! Wraps the in-memory store. While `fail(true)` is in effect every call
//! returns `StoreError::Unavailable`, as a PostgreSQL store does when the
//! database goes away.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use listlock::backend::error::StoreError;
use listlock::backend::store::{Claim, LockStore, MemoryLockStore, StoreResult};
use listlock::shared::lock::{ConnectionId, ItemId, LockRecord};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct SwitchableStore {
    inner: MemoryLockStore,
    failing: Arc<AtomicBool>,
}

impl SwitchableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The wrapped store, bypassing the switch
    pub fn inner(&self) -> &MemoryLockStore {
        &self.inner
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl LockStore for SwitchableStore {
    async fn try_acquire(
        &self,
        item_id: &str,
        owner: ConnectionId,
        field: &str,
        content: &str,
    ) -> StoreResult<Claim> {
        self.check()?;
        self.inner.try_acquire(item_id, owner, field, content).await
    }

    async fn release(&self, item_id: &str, owner: ConnectionId) -> StoreResult<bool> {
        self.check()?;
        self.inner.release(item_id, owner).await
    }

    async fn update_content(
        &self,
        item_id: &str,
        owner: ConnectionId,
        field: &str,
        content: &str,
    ) -> StoreResult<bool> {
        self.check()?;
        self.inner.update_content(item_id, owner, field, content).await
    }

    async fn snapshot(&self) -> StoreResult<BTreeSet<ItemId>> {
        self.check()?;
        self.inner.snapshot().await
    }

    async fn all_records(&self) -> StoreResult<Vec<LockRecord>> {
        self.check()?;
        self.inner.all_records().await
    }

    async fn record(&self, item_id: &str) -> StoreResult<Option<LockRecord>> {
        self.check()?;
        self.inner.record(item_id).await
    }

    async fn refresh(&self, owner: ConnectionId) -> StoreResult<usize> {
        self.check()?;
        self.inner.refresh(owner).await
    }

    async fn expire_stale(&self, ttl: Duration, now: DateTime<Utc>) -> StoreResult<Vec<LockRecord>> {
        self.check()?;
        self.inner.expire_stale(ttl, now).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.check()
    }
}
