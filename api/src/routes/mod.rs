//! API route definitions.
//!
//! This module organizes all HTTP routes for the Edgewatch API server.

mod health;
mod ingest;

pub use health::health_routes;
pub use ingest::ingest_routes;
