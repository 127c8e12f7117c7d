//! Edgewatch Shared Library
//!
//! Everything the ingestion pipeline does apart from HTTP plumbing: the
//! canonical telemetry model, wire decoders, record identity, storage,
//! anomaly detection and alert dispatch.
//!
//! # Modules
//!
//! - [`models`] - Canonical metric samples, log records, spans and anomalies
//! - [`decode`] - Wire dialect decoders and the auto-detection chain
//! - [`otlp`] - OTLP message types and conversions
//! - [`identity`] - Content-addressed record identifiers
//! - [`storage`] - Storage trait, backends and the chunked writer
//! - [`detect`] - Robust z-score anomaly detection
//! - [`alert`] - Best-effort alert dispatch
//! - [`config`] - Retention configuration
//!
//! # Example
//!
//! ```
//! use shared::decode::{decode, FormatHint};
//! use shared::detect::AnomalyDetector;
//!
//! let body = br#"{"timeseries":[{"labels":{"__name__":"cpu_pct","cluster_id":"edge-1"},
//!     "samples":[{"timestamp_ms":1000,"value":10},{"timestamp_ms":2000,"value":11},
//!                {"timestamp_ms":3000,"value":9},{"timestamp_ms":4000,"value":10},
//!                {"timestamp_ms":5000,"value":200}]}]}"#;
//!
//! let decoded = decode(body, FormatHint::Auto).unwrap();
//! let samples = decoded.batch.samples().unwrap();
//! let anomalies = AnomalyDetector::default().detect(samples);
//! assert_eq!(anomalies.len(), 1);
//! assert_eq!(anomalies[0].tenant_id, "edge-1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod alert;
pub mod config;
pub mod decode;
pub mod detect;
pub mod identity;
pub mod models;
pub mod otlp;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
