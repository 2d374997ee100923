//! Integration tests
//!
//! End-to-end scenarios over one or more coordinator instances, plus the
//! HTTP surface and the PostgreSQL adapters.

mod replication_test;
