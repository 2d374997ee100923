//! Connection Module
//!
//! Tracks the client connections attached to this instance and the locks
//! each of them holds. Nothing here is replicated; every instance has its
//! own registry and passes it explicitly to the coordinator and reaper.

/// Per-instance connection registry
pub mod registry;

pub use registry::{ConnectionEntry, ConnectionRegistry};
