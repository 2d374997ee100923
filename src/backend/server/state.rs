/**
 * Application State Management
 *
 * This module defines the application state structure and implements the
 * `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * `AppState` holds the instance's `LockCoordinator`, which in turn owns the
 * shared lock store, the backplane and the local connection registry. There
 * is no other process-wide mutable state; everything a handler needs is
 * threaded through here.
 *
 * # Example
 *
 * ```rust
 * use listlock::backend::coordinator::LockCoordinator;
 * use axum::extract::State;
 *
 * async fn handler(State(coordinator): State<LockCoordinator>) {
 *     let connections = coordinator.registry().len().await;
 *     // ...
 * }
 * ```
 */

use crate::backend::coordinator::LockCoordinator;
use axum::extract::FromRef;
use chrono::{DateTime, Utc};

/// Application state shared by every handler
#[derive(Clone, Debug)]
pub struct AppState {
    /// This instance's lock coordinator
    pub coordinator: LockCoordinator,

    /// When this instance started serving
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(coordinator: LockCoordinator) -> Self {
        Self {
            coordinator,
            started_at: Utc::now(),
        }
    }
}

/// Implement FromRef for LockCoordinator
///
/// This allows Axum handlers to extract the coordinator directly from
/// `AppState` using `State(LockCoordinator)`.
impl FromRef<AppState> for LockCoordinator {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.coordinator.clone()
    }
}
