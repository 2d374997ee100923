//! Backend Module
//!
//! This module contains all server-side code of the edit-lock coordinator:
//! an Axum server that hands out per-item edit locks to list clients over
//! WebSocket and keeps several server instances in agreement.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Server initialization, application state, configuration
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`coordinator`** - Lock protocol, disconnect reaper, lease maintenance
//! - **`store`** - Shared lock store (in-memory or PostgreSQL)
//! - **`backplane`** - Cross-instance event bus (in-process or LISTEN/NOTIFY)
//! - **`connection`** - Connections of this instance and the locks they hold
//! - **`realtime`** - WebSocket endpoint and backplane relay
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs       - Module exports and documentation
//! ├── server/      - Server initialization and state
//! ├── routes/      - Route configuration
//! ├── coordinator/ - Lock protocol
//! ├── store/       - Lock store adapters
//! ├── backplane/   - Backplane adapters
//! ├── connection/  - Connection registry
//! ├── realtime/    - WebSocket and relay
//! └── error/       - Error types
//! ```
//!
//! # Consistency
//!
//! The store is the single source of truth for who holds what. The registry
//! is a local index used for delivery and for finding a closing
//! connection's locks; every mutation of the store is ownership-gated, so a
//! stale index entry can never release somebody else's lock.
//!
//! Events reach local clients only through the relay, which excludes the
//! originating connection. An instance therefore sees its own events once,
//! exactly like its peers do.

/// Server setup and configuration
#[cfg(feature = "ssr")]
pub mod server;

/// Route configuration
#[cfg(feature = "ssr")]
pub mod routes;

/// Lock protocol engine
#[cfg(feature = "ssr")]
pub mod coordinator;

/// Shared lock store
#[cfg(feature = "ssr")]
pub mod store;

/// Cross-instance event bus
#[cfg(feature = "ssr")]
pub mod backplane;

/// Local connection registry
#[cfg(feature = "ssr")]
pub mod connection;

/// Real-time transport
#[cfg(feature = "ssr")]
pub mod realtime;

/// Backend error types
#[cfg(feature = "ssr")]
pub mod error;

/// Re-export commonly used types
#[cfg(feature = "ssr")]
pub use server::create_app;
#[cfg(feature = "ssr")]
pub use coordinator::{AcquireOutcome, CoordinatorConfig, LockCoordinator, ReapReport};
#[cfg(feature = "ssr")]
pub use store::{Claim, LockStore, MemoryLockStore, PgLockStore};
#[cfg(feature = "ssr")]
pub use backplane::{Backplane, MemoryBackplane, PgBackplane};
#[cfg(feature = "ssr")]
pub use connection::ConnectionRegistry;
#[cfg(feature = "ssr")]
pub use error::{BackendError, BackplaneError, StoreError};
