/**
 * Lock API Routes
 *
 * Plain HTTP endpoints next to the WebSocket channel. They serve the
 * durable-storage collaborator and operators rather than the list UI:
 *
 * - `GET /health` - Store reachability
 * - `GET /locks` - Currently locked item ids
 * - `GET /locks/{item_id}` - One lock record, including unsaved content
 * - `POST /notify/refresh` - Persisted data changed; tell every client
 */

use crate::backend::coordinator::LockCoordinator;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::shared::lock::{ItemId, LockRecord};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Response body of `GET /locks`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocksResponse {
    pub item_ids: Vec<ItemId>,
}

/// Response body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub instance_id: String,
    pub connections: usize,
    pub uptime_secs: i64,
}

/// Add the lock API routes to `router`
pub fn configure_api_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/health", get(handle_health))
        .route("/locks", get(handle_list_locks))
        .route("/locks/{item_id}", get(handle_get_lock))
        .route("/notify/refresh", post(handle_notify_refresh))
}

/// Handle GET /health
///
/// # Errors
///
/// * `503 Service Unavailable` - The lock store cannot be reached
pub async fn handle_health(State(app_state): State<AppState>) -> Result<Json<HealthResponse>, BackendError> {
    let coordinator = &app_state.coordinator;
    coordinator.store().health_check().await?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        instance_id: coordinator.instance_id().to_string(),
        connections: coordinator.registry().len().await,
        uptime_secs: (Utc::now() - app_state.started_at).num_seconds(),
    }))
}

/// Handle GET /locks
pub async fn handle_list_locks(
    State(coordinator): State<LockCoordinator>,
) -> Result<Json<LocksResponse>, BackendError> {
    let item_ids = coordinator.snapshot().await?.into_iter().collect();
    Ok(Json(LocksResponse { item_ids }))
}

/// Handle GET /locks/{item_id}
///
/// # Errors
///
/// * `404 Not Found` - The item is not locked
pub async fn handle_get_lock(
    State(coordinator): State<LockCoordinator>,
    Path(item_id): Path<String>,
) -> Result<Json<LockRecord>, BackendError> {
    coordinator
        .record(&item_id)
        .await?
        .map(Json)
        .ok_or_else(|| BackendError::handler(StatusCode::NOT_FOUND, format!("item {} is not locked", item_id)))
}

/// Handle POST /notify/refresh
///
/// Called by the durable-storage layer after it commits a change.
pub async fn handle_notify_refresh(
    State(coordinator): State<LockCoordinator>,
) -> Result<StatusCode, BackendError> {
    coordinator.notify_refresh().await?;
    Ok(StatusCode::ACCEPTED)
}
