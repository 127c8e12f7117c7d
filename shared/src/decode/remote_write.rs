//! Prometheus remote-write dialect.
//!
//! The body is a (decompressed) protobuf `WriteRequest`. Protobuf decoding is
//! permissive enough that unrelated bytes can parse as a valid message, so a
//! decode is only accepted when every label name is a valid Prometheus label
//! name.

use super::tenant::{tenant_from_labels, TenantTracker};
use super::{looks_like_json, DecodeError, DecodedBatch, Dialect};
use crate::models::{MetricSample, TelemetryBatch, METRIC_NAME_LABEL};
use prost::Message;
use std::collections::BTreeMap;

/// `prometheus.WriteRequest`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct WriteRequest {
    /// Time series in the request.
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

/// `prometheus.TimeSeries`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TimeSeries {
    /// Label set of the series.
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    /// Samples of the series.
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
}

/// `prometheus.Label`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Label {
    /// Label name.
    #[prost(string, tag = "1")]
    pub name: String,
    /// Label value.
    #[prost(string, tag = "2")]
    pub value: String,
}

/// `prometheus.Sample`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Sample {
    /// Sample value.
    #[prost(double, tag = "1")]
    pub value: f64,
    /// Milliseconds since the Unix epoch.
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

/// Returns true for names matching `[a-zA-Z_][a-zA-Z0-9_]*`.
#[must_use]
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Decodes a remote-write body into metric samples.
///
/// Series without a `__name__` label are dropped and their samples counted
/// as rejected.
///
/// # Errors
///
/// Returns an error if the body is JSON, is not a protobuf `WriteRequest`, or
/// carries invalid label names.
pub fn decode(body: &[u8]) -> Result<DecodedBatch, DecodeError> {
    let dialect = Dialect::RemoteWrite;
    if looks_like_json(body) {
        return Err(DecodeError::mismatch(dialect, "body is JSON"));
    }

    let request = WriteRequest::decode(body).map_err(|e| DecodeError::invalid(dialect, e))?;

    let mut tracker = TenantTracker::default();
    let mut samples = Vec::new();
    let mut rejected = 0;

    for series in request.timeseries {
        if let Some(bad) = series.labels.iter().find(|l| !is_valid_label_name(&l.name)) {
            return Err(DecodeError::mismatch(
                dialect,
                format!("invalid label name '{}'", bad.name.escape_debug()),
            ));
        }

        let labels: BTreeMap<String, String> = series
            .labels
            .into_iter()
            .map(|l| (l.name, l.value))
            .collect();

        if labels.get(METRIC_NAME_LABEL).is_none_or(String::is_empty) {
            tracing::debug!(samples = series.samples.len(), "Dropping series without __name__");
            rejected += series.samples.len();
            continue;
        }

        let tenant_id = tenant_from_labels(&labels);
        tracker.observe(&tenant_id);

        samples.extend(series.samples.into_iter().map(|s| {
            MetricSample::from_millis(labels.clone(), s.timestamp, s.value)
                .with_tenant(tenant_id.clone())
        }));
    }

    Ok(DecodedBatch {
        dialect,
        batch: TelemetryBatch::Metrics(samples),
        rejected,
        current_tenant: tracker.into_current(),
    })
}
