//! Anomaly data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A metric sample flagged by the anomaly detector.
///
/// Anomalies are never persisted; they live only as long as one alert
/// dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    /// Name of the metric the sample belongs to.
    pub metric_name: String,
    /// `instance` label, or `"unknown"`.
    pub instance: String,
    /// `job` label, or `"unknown"`.
    pub job: String,
    /// Raw sample value.
    pub value: f64,
    /// Sample timestamp in seconds since the Unix epoch.
    pub timestamp: f64,
    /// Human-readable explanation including the score and threshold.
    pub reason: String,
    /// Tenant the sample was ingested for; used for alert routing.
    pub tenant_id: String,
}

impl Anomaly {
    /// Returns the sample time as a `DateTime<Utc>`, if representable.
    #[must_use]
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        #[allow(clippy::cast_possible_truncation)]
        let millis = (self.timestamp * 1000.0).round() as i64;
        DateTime::from_timestamp_millis(millis)
    }
}
