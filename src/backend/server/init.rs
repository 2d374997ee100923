/**
 * Server Initialization
 *
 * This module handles the initialization and setup of the Axum HTTP server,
 * including adapter selection, background tasks, and route configuration.
 *
 * # Initialization Process
 *
 * The server initialization follows these steps:
 * 1. Build the lock store and the backplane selected by the configuration
 * 2. Create the connection registry and the coordinator
 * 3. Start the backplane relay and the lease maintenance task
 * 4. Create and configure the router
 *
 * # Shared Database Pool
 *
 * When both the store and the backplane are PostgreSQL they share one
 * pool. The store's connect step runs migrations, so it goes first.
 */

use crate::backend::backplane::{Backplane, MemoryBackplane, PgBackplane};
use crate::backend::coordinator::LockCoordinator;
use crate::backend::connection::ConnectionRegistry;
use crate::backend::error::{BackendError, StoreError};
use crate::backend::realtime::spawn_relay;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{BackendKind, ServerConfig};
use crate::backend::server::state::AppState;
use crate::backend::store::{LockStore, MemoryLockStore, PgLockStore};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Create and configure the Axum application
///
/// # Errors
///
/// Fails when a PostgreSQL adapter is selected and the database cannot be
/// reached. A coordinator without its store cannot guarantee exclusivity,
/// so the caller should refuse to start.
pub async fn create_app(config: &ServerConfig) -> Result<Router, BackendError> {
    let coordinator = build_coordinator(config).await?;
    Ok(start_app(coordinator))
}

/// Spawn the background tasks of `coordinator` and build its router
///
/// The tasks are detached; they end when the runtime shuts down.
pub fn start_app(coordinator: LockCoordinator) -> Router {
    let _relay = spawn_relay(coordinator.backplane().as_ref(), coordinator.registry().clone());
    let _lease = coordinator.spawn_lease_maintenance();

    tracing::info!(
        "[Coordinator] Instance {} ready (ttl {:?}, refresh {:?})",
        coordinator.instance_id(),
        coordinator.config().lock_ttl,
        coordinator.config().refresh_interval
    );

    create_router(AppState::new(coordinator))
}

/// Build a coordinator with the adapters named in `config`
pub async fn build_coordinator(config: &ServerConfig) -> Result<LockCoordinator, BackendError> {
    let mut pool: Option<PgPool> = None;

    let store: Arc<dyn LockStore> = match config.store {
        BackendKind::Memory => {
            tracing::info!("[Store] Using in-memory lock store");
            Arc::new(MemoryLockStore::new())
        }
        BackendKind::Postgres => {
            let store = PgLockStore::connect(database_url(config)?).await?;
            pool = Some(store.pool().clone());
            Arc::new(store)
        }
    };

    let backplane: Arc<dyn Backplane> = match config.backplane {
        BackendKind::Memory => {
            tracing::info!("[Relay] Using in-process backplane");
            Arc::new(MemoryBackplane::new(config.broadcast_capacity))
        }
        BackendKind::Postgres => {
            let pool = match pool {
                Some(pool) => pool,
                None => {
                    PgPoolOptions::new()
                        .max_connections(5)
                        .acquire_timeout(Duration::from_secs(5))
                        .connect(database_url(config)?)
                        .await
                        .map_err(crate::backend::error::BackplaneError::from)?
                }
            };
            Arc::new(PgBackplane::connect(pool, config.broadcast_capacity).await?)
        }
    };

    Ok(LockCoordinator::new(
        store,
        backplane,
        ConnectionRegistry::new(),
        config.coordinator.clone(),
    ))
}

fn database_url(config: &ServerConfig) -> Result<&str, StoreError> {
    config
        .database_url
        .as_deref()
        .ok_or_else(|| StoreError::unavailable("DATABASE_URL is not set"))
}
