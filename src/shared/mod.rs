//! Shared Module
//!
//! This module contains the types shared between the lock coordinator and
//! its clients. They describe lock records, the replicated events carried
//! by the backplane, and the JSON vocabulary spoken over the WebSocket.
//!
//! # Overview
//!
//! Nothing here depends on the server runtime, so the module compiles
//! without the `ssr` feature and can be reused by a Rust client.

/// Lock records and connection identifiers
pub mod lock;

/// Replicated lock events
pub mod event;

/// Client wire protocol
pub mod protocol;

/// Shared error types
pub mod error;

/// Re-export commonly used types for convenience
pub use error::SharedError;
pub use event::{LockEvent, ReplicatedEvent};
pub use lock::{ConnectionId, ItemId, LockRecord, LockState};
pub use protocol::{ClientMessage, ServerMessage};
