//! Robust z-score anomaly detection.
//!
//! Samples are grouped by metric name and each group is scored with the
//! modified z-score of Iglewicz and Hoaglin:
//!
//! ```text
//! modified_z = 0.6745 * (value - median) / MAD
//! ```
//!
//! where MAD is the median absolute deviation from the median. A sample is
//! anomalous when `|modified_z| > threshold`.
//!
//! Groups are skipped when the name ends in `_total` (monotonic counters),
//! when they hold fewer than three samples, or when MAD is zero. The detector
//! keeps no state between calls; each batch is scored in isolation.

use crate::models::{Anomaly, MetricSample};
use std::collections::BTreeMap;
use thiserror::Error;

/// Default modified z-score threshold.
pub const DEFAULT_THRESHOLD: f64 = 3.5;

/// Scale factor relating MAD to the standard deviation of a normal
/// distribution.
pub const MAD_SCALE: f64 = 0.6745;

/// Smallest group that is scored.
pub const MIN_SAMPLES: usize = 3;

/// Name suffix of monotonic counters, which are never scored.
pub const COUNTER_SUFFIX: &str = "_total";

/// Errors scoped to one metric group.
#[derive(Debug, Error, PartialEq)]
pub enum DetectorError {
    /// A sample value is NaN or infinite.
    #[error("Non-finite value {value} in metric '{metric}'")]
    NonFinite {
        /// Metric name of the group.
        metric: String,
        /// The offending value.
        value: f64,
    },
}

/// Why a group produced no score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Name ends in `_total`.
    Counter,
    /// Fewer than [`MIN_SAMPLES`] samples.
    TooFewSamples,
    /// All deviations are zero.
    ZeroMad,
}

/// Result of scoring one group.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupOutcome {
    /// The group was scored; the vector may be empty.
    Scored(Vec<Anomaly>),
    /// The group was not scored.
    Skipped(SkipReason),
}

/// MAD-based anomaly detector.
///
/// # Example
///
/// ```
/// use shared::detect::AnomalyDetector;
/// use shared::models::MetricSample;
///
/// let samples: Vec<MetricSample> = [10.0, 11.0, 9.0, 10.0, 200.0]
///     .iter()
///     .enumerate()
///     .map(|(i, v)| MetricSample::new("cpu_pct", i as f64, *v))
///     .collect();
///
/// let anomalies = AnomalyDetector::default().detect(&samples);
/// assert_eq!(anomalies.len(), 1);
/// assert_eq!(anomalies[0].value, 200.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    threshold: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl AnomalyDetector {
    /// Creates a detector with a custom threshold.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The configured threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Scores a batch and returns every anomalous sample.
    ///
    /// A group that fails with a [`DetectorError`] is logged and skipped;
    /// the other groups are still scored.
    #[must_use]
    pub fn detect(&self, samples: &[MetricSample]) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        for (name, group) in group_by_name(samples) {
            match self.detect_group(name, &group) {
                Ok(GroupOutcome::Scored(found)) => anomalies.extend(found),
                Ok(GroupOutcome::Skipped(reason)) => {
                    tracing::trace!(metric = name, ?reason, "Skipped metric group");
                }
                Err(e) => {
                    tracing::warn!(metric = name, error = %e, "Anomaly detection failed for group");
                }
            }
        }

        anomalies
    }

    /// Scores one group of same-named samples.
    ///
    /// # Errors
    ///
    /// Returns [`DetectorError::NonFinite`] if the group holds a NaN or
    /// infinite value.
    pub fn detect_group(
        &self,
        name: &str,
        group: &[&MetricSample],
    ) -> Result<GroupOutcome, DetectorError> {
        if name.ends_with(COUNTER_SUFFIX) {
            return Ok(GroupOutcome::Skipped(SkipReason::Counter));
        }
        if group.len() < MIN_SAMPLES {
            return Ok(GroupOutcome::Skipped(SkipReason::TooFewSamples));
        }
        if let Some(bad) = group.iter().find(|s| !s.value.is_finite()) {
            return Err(DetectorError::NonFinite {
                metric: name.to_string(),
                value: bad.value,
            });
        }

        let values: Vec<f64> = group.iter().map(|s| s.value).collect();
        let center = median(&values);
        let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
        let mad = median(&deviations);

        if mad <= 0.0 {
            return Ok(GroupOutcome::Skipped(SkipReason::ZeroMad));
        }

        let anomalies = group
            .iter()
            .filter_map(|sample| {
                let score = MAD_SCALE * (sample.value - center) / mad;
                (score.abs() > self.threshold).then(|| self.anomaly(sample, score, center, mad))
            })
            .collect();

        Ok(GroupOutcome::Scored(anomalies))
    }

    fn anomaly(&self, sample: &MetricSample, score: f64, center: f64, mad: f64) -> Anomaly {
        Anomaly {
            metric_name: sample.name().to_string(),
            instance: sample.instance().to_string(),
            job: sample.job().to_string(),
            value: sample.value,
            timestamp: sample.timestamp,
            reason: format!(
                "modified z-score {score:.2} exceeds threshold {:.2} (median {center}, MAD {mad})",
                self.threshold
            ),
            tenant_id: sample.tenant_id.clone(),
        }
    }
}

/// Groups samples by metric name, preserving first-seen order within groups.
#[must_use]
pub fn group_by_name(samples: &[MetricSample]) -> BTreeMap<&str, Vec<&MetricSample>> {
    let mut groups: BTreeMap<&str, Vec<&MetricSample>> = BTreeMap::new();
    for sample in samples {
        groups.entry(sample.name()).or_default().push(sample);
    }
    groups
}

/// Median of a non-empty slice of finite values.
///
/// Returns `NaN` for an empty slice.
#[must_use]
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
