//! Listlock - Collaborative Edit-Lock Coordinator
//!
//! A small real-time coordination service for a shared list UI. Each list
//! item can be edited by at most one client at a time; the server hands out
//! per-item edit locks, broadcasts lock and content events to every other
//! client, and releases a client's locks when it disconnects. Any number of
//! server instances can run side by side by sharing a lock store and a
//! backplane.
//!
//! # Module Structure
//!
//! - **`shared`** - Wire types shared by server and clients
//!   - Client/server messages, replication events
//!   - Lock records and connection ids
//!   - Error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum server with a WebSocket endpoint
//!   - Lock coordinator, reaper, lease maintenance
//!   - In-memory and PostgreSQL adapters
//!
//! # Feature Flags
//!
//! - **`ssr`** - Server build (enables backend modules, on by default)
//!
//! # Usage
//!
//! ```rust,no_run
//! use listlock::backend::server::{config::ServerConfig, create_app};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! let app = create_app(&config).await?;
//! // Use app with axum::serve
//! # Ok(())
//! # }
//! ```
//!
//! # Wire Protocol
//!
//! Clients exchange JSON text frames on `GET /ws`:
//!
//! ```text
//! → {"type":"request-lock","item_id":"42","field":"title","content":"Buy milk"}
//! ← {"type":"lock-acquired","item_id":"42","field":"title"}
//! ```
//!
//! Everyone else receives `lock-granted`, and later `content-changed` and
//! `lock-released` for the same item.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
