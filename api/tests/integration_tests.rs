//! Integration tests for the Edgewatch API.
//!
//! These tests drive the full router: envelope handling, dialect detection,
//! storage, anomaly detection and alert dispatch.

mod integration_tests {
    pub mod common;
    mod alert_tests;
    mod dialect_tests;
    mod health_tests;
    mod ingest_tests;
}
