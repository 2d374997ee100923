/**
 * PostgreSQL Lock Store
 *
 * Networked adapter for multi-instance deployments. Each trait operation is
 * exactly one SQL statement, and the `edit_locks` primary key provides the
 * check-and-set: two instances racing on the same item produce one winner.
 *
 * # Schema
 *
 * See `migrations/20250101000000_create_edit_locks.sql`.
 */

use crate::backend::error::StoreError;
use crate::backend::store::{Claim, LockStore, StoreResult};
use crate::shared::lock::{ConnectionId, ItemId, LockRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

/// Row shape of `edit_locks`
#[derive(sqlx::FromRow)]
struct LockRow {
    item_id: String,
    owner: Uuid,
    field: String,
    pending_content: String,
    acquired_at: DateTime<Utc>,
    refreshed_at: DateTime<Utc>,
}

impl From<LockRow> for LockRecord {
    fn from(row: LockRow) -> Self {
        Self {
            item_id: row.item_id,
            owner: ConnectionId::from_uuid(row.owner),
            field: row.field,
            pending_content: row.pending_content,
            acquired_at: row.acquired_at,
            refreshed_at: row.refreshed_at,
        }
    }
}

/// Lock store backed by a PostgreSQL table
#[derive(Debug, Clone)]
pub struct PgLockStore {
    pool: PgPool,
}

impl PgLockStore {
    /// Wrap an existing pool (migrations must already have run)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and run migrations
    ///
    /// Unlike optional services, a lock store that cannot be reached is not
    /// skipped: the error is returned so the server refuses to start.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        tracing::info!("[Store] Connecting to PostgreSQL lock store...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("[Store] Running lock store migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::unavailable(format!("migration failed: {}", e)))?;

        tracing::info!("[Store] PostgreSQL lock store ready");
        Ok(Self { pool })
    }

    /// The underlying pool, shared with the Postgres backplane
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LockStore for PgLockStore {
    async fn try_acquire(
        &self,
        item_id: &str,
        owner: ConnectionId,
        field: &str,
        content: &str,
    ) -> StoreResult<Claim> {
        // `xmax = 0` only holds for a freshly inserted row. `prior` sees the
        // row as it was before this statement, so `changed` compares the
        // retag against the old field and content.
        let row: Option<(bool, bool)> = sqlx::query_as(
            r#"
            WITH prior AS (
                SELECT field, pending_content FROM edit_locks WHERE item_id = $1
            )
            INSERT INTO edit_locks (item_id, owner, field, pending_content, acquired_at, refreshed_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (item_id) DO UPDATE SET
                field = EXCLUDED.field,
                pending_content = EXCLUDED.pending_content,
                refreshed_at = NOW()
            WHERE edit_locks.owner = EXCLUDED.owner
            RETURNING
                (xmax = 0) AS inserted,
                ((SELECT field FROM prior) IS DISTINCT FROM $3
                    OR (SELECT pending_content FROM prior) IS DISTINCT FROM $4) AS changed
            "#,
        )
        .bind(item_id)
        .bind(owner.as_uuid())
        .bind(field)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            None => Claim::Denied,
            Some((true, _)) => Claim::Created,
            Some((false, changed)) => Claim::Reclaimed { changed },
        })
    }

    async fn release(&self, item_id: &str, owner: ConnectionId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM edit_locks WHERE item_id = $1 AND owner = $2")
            .bind(item_id)
            .bind(owner.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_content(
        &self,
        item_id: &str,
        owner: ConnectionId,
        field: &str,
        content: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE edit_locks
            SET field = $3, pending_content = $4
            WHERE item_id = $1 AND owner = $2
            "#,
        )
        .bind(item_id)
        .bind(owner.as_uuid())
        .bind(field)
        .bind(content)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn snapshot(&self) -> StoreResult<BTreeSet<ItemId>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT item_id FROM edit_locks")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(item_id,)| item_id).collect())
    }

    async fn all_records(&self) -> StoreResult<Vec<LockRecord>> {
        let rows = sqlx::query_as::<_, LockRow>(
            r#"
            SELECT item_id, owner, field, pending_content, acquired_at, refreshed_at
            FROM edit_locks
            ORDER BY acquired_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LockRecord::from).collect())
    }

    async fn record(&self, item_id: &str) -> StoreResult<Option<LockRecord>> {
        let row = sqlx::query_as::<_, LockRow>(
            r#"
            SELECT item_id, owner, field, pending_content, acquired_at, refreshed_at
            FROM edit_locks
            WHERE item_id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(LockRecord::from))
    }

    async fn refresh(&self, owner: ConnectionId) -> StoreResult<usize> {
        let result = sqlx::query("UPDATE edit_locks SET refreshed_at = NOW() WHERE owner = $1")
            .bind(owner.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() as usize)
    }

    async fn expire_stale(&self, ttl: Duration, _now: DateTime<Utc>) -> StoreResult<Vec<LockRecord>> {
        // Heartbeats are stamped with the database clock, so age is measured
        // against it too.
        let rows = sqlx::query_as::<_, LockRow>(
            r#"
            DELETE FROM edit_locks
            WHERE refreshed_at < NOW() - make_interval(secs => $1)
            RETURNING item_id, owner, field, pending_content, acquired_at, refreshed_at
            "#,
        )
        .bind(ttl.as_secs_f64())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LockRecord::from).collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
