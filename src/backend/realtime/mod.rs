//! Real-time Module
//!
//! Client-facing transport and cross-instance fan-out.
//!
//! # Architecture
//!
//! - **`socket`** - WebSocket endpoint, one task per connection
//! - **`relay`** - Backplane subscriber that re-broadcasts events to the
//!   connections of this instance
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs    - Module exports and documentation
//! ├── socket.rs - WebSocket connection handler
//! └── relay.rs  - Backplane relay task
//! ```
//!
//! # Event Flow
//!
//! ```text
//! client ──ws──▶ socket ──dispatch──▶ coordinator ──publish──▶ backplane
//!                                                                  │
//! clients ◀──ws── socket writers ◀── registry ◀── relay ◀──────────┘
//! ```

/// WebSocket connection handler
pub mod socket;

/// Backplane relay
pub mod relay;

pub use relay::spawn_relay;
pub use socket::handle_socket_upgrade;
