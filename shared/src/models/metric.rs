//! Metric sample data model.
//!
//! Defines the canonical `MetricSample` that every metric dialect decodes into.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Label key carrying the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Literal used when a routing label is absent.
pub const UNKNOWN: &str = "unknown";

/// A single labeled measurement.
///
/// Labels are kept in a `BTreeMap` so iteration is always sorted by key,
/// which the identity builder relies on.
///
/// # Example
///
/// ```
/// use shared::models::MetricSample;
///
/// let sample = MetricSample::new("cpu_pct", 1_700_000_000.0, 42.0)
///     .with_label("instance", "node-a")
///     .with_label("job", "node");
///
/// assert_eq!(sample.name(), "cpu_pct");
/// assert_eq!(sample.instance(), "node-a");
/// assert!(sample.validate_sample().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Label set, always containing `__name__` after decoding.
    pub labels: BTreeMap<String, String>,

    /// Seconds since the Unix epoch.
    pub timestamp: f64,

    /// The measured value.
    pub value: f64,

    /// Tenant/cluster the sample belongs to.
    #[serde(default = "unknown_tenant")]
    pub tenant_id: String,
}

fn unknown_tenant() -> String {
    UNKNOWN.to_string()
}

/// Errors that can occur during sample validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleValidationError {
    /// The `__name__` label is missing or empty.
    #[error("Metric sample has no __name__ label")]
    MissingName,
}

impl MetricSample {
    /// Creates a sample with only the `__name__` label set.
    #[must_use]
    pub fn new(name: impl Into<String>, timestamp: f64, value: f64) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(METRIC_NAME_LABEL.to_string(), name.into());
        Self {
            labels,
            timestamp,
            value,
            tenant_id: unknown_tenant(),
        }
    }

    /// Creates a sample from a full label set.
    ///
    /// `timestamp_ms` is converted to fractional seconds.
    #[must_use]
    pub fn from_millis(labels: BTreeMap<String, String>, timestamp_ms: i64, value: f64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let timestamp = timestamp_ms as f64 / 1000.0;
        Self {
            labels,
            timestamp,
            value,
            tenant_id: unknown_tenant(),
        }
    }

    /// Adds a label to the sample.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Sets the owning tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    /// Returns the metric name, or an empty string when unnamed.
    #[must_use]
    pub fn name(&self) -> &str {
        self.labels
            .get(METRIC_NAME_LABEL)
            .map_or("", String::as_str)
    }

    /// Returns the `instance` label, defaulting to `"unknown"`.
    #[must_use]
    pub fn instance(&self) -> &str {
        self.label_or_unknown("instance")
    }

    /// Returns the `job` label, defaulting to `"unknown"`.
    #[must_use]
    pub fn job(&self) -> &str {
        self.label_or_unknown("job")
    }

    fn label_or_unknown(&self, key: &str) -> &str {
        self.labels.get(key).map_or(UNKNOWN, String::as_str)
    }

    /// Validates that the sample carries a non-empty name.
    ///
    /// # Errors
    ///
    /// Returns [`SampleValidationError::MissingName`] when `__name__` is
    /// absent or empty.
    pub fn validate_sample(&self) -> Result<(), SampleValidationError> {
        if self.name().is_empty() {
            return Err(SampleValidationError::MissingName);
        }
        Ok(())
    }
}
