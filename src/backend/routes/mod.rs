//! Routes Module
//!
//! HTTP route configuration.
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs        - Module exports
//! ├── router.rs     - Router assembly and middleware
//! └── api_routes.rs - Lock API endpoints
//! ```

/// Router assembly
pub mod router;

/// Lock API endpoints
pub mod api_routes;

pub use router::create_router;
