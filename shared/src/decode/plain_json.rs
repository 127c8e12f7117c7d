//! Plain JSON metric dialect.
//!
//! Two shapes are accepted:
//!
//! ```text
//! {"timeseries": [{"labels": {...}, "samples": [{"timestamp_ms": 1, "value": 2.0}]}]}
//! {"metric": {...}, "value": [1678886400.0, "1"]}      (single object or array)
//! ```
//!
//! The second is the Prometheus instant-vector shape, with the timestamp in
//! seconds.

use super::tenant::{tenant_from_labels, TenantTracker};
use super::{DecodeError, DecodedBatch, Dialect};
use crate::models::{MetricSample, TelemetryBatch};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeseriesBody {
    timeseries: Vec<JsonSeries>,
}

#[derive(Debug, Deserialize)]
struct JsonSeries {
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    samples: Vec<JsonSample>,
}

#[derive(Debug, Deserialize)]
struct JsonSample {
    #[serde(deserialize_with = "crate::otlp::json::i64_from_any")]
    timestamp_ms: i64,
    #[serde(deserialize_with = "crate::otlp::json::f64_from_any")]
    value: f64,
}

#[derive(Debug, Deserialize)]
struct InstantSample {
    metric: BTreeMap<String, String>,
    value: (InstantNumber, InstantNumber),
}

#[derive(Debug, Deserialize)]
struct InstantNumber(#[serde(deserialize_with = "crate::otlp::json::f64_from_any")] f64);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PlainBody {
    Timeseries(TimeseriesBody),
    Instant(InstantSample),
    InstantList(Vec<InstantSample>),
}

/// Decodes a plain JSON metric body.
///
/// Samples without a `__name__` label are dropped and counted as rejected.
///
/// # Errors
///
/// Returns an error if the body is not JSON or matches neither shape.
pub fn decode(body: &[u8]) -> Result<DecodedBatch, DecodeError> {
    let dialect = Dialect::PlainJson;
    let parsed: PlainBody =
        serde_json::from_slice(body).map_err(|e| DecodeError::mismatch(dialect, e))?;

    let candidates: Vec<MetricSample> = match parsed {
        PlainBody::Timeseries(body) => body
            .timeseries
            .into_iter()
            .flat_map(|series| {
                let labels = series.labels;
                series
                    .samples
                    .into_iter()
                    .map(move |s| MetricSample::from_millis(labels.clone(), s.timestamp_ms, s.value))
            })
            .collect(),
        PlainBody::Instant(sample) => vec![instant_to_sample(sample)],
        PlainBody::InstantList(samples) => samples.into_iter().map(instant_to_sample).collect(),
    };

    let mut tracker = TenantTracker::default();
    let mut samples = Vec::with_capacity(candidates.len());
    let mut rejected = 0;

    for mut sample in candidates {
        if sample.validate_sample().is_err() {
            rejected += 1;
            continue;
        }
        sample.tenant_id = tenant_from_labels(&sample.labels);
        tracker.observe(&sample.tenant_id);
        samples.push(sample);
    }

    Ok(DecodedBatch {
        dialect,
        batch: TelemetryBatch::Metrics(samples),
        rejected,
        current_tenant: tracker.into_current(),
    })
}

fn instant_to_sample(sample: InstantSample) -> MetricSample {
    let (InstantNumber(timestamp), InstantNumber(value)) = sample.value;
    MetricSample {
        labels: sample.metric,
        timestamp,
        value,
        tenant_id: crate::models::UNKNOWN.to_string(),
    }
}
