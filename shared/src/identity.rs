//! Content-addressed record identifiers.
//!
//! Metric samples get an identifier derived only from their content, so a
//! retried delivery of the same payload overwrites instead of duplicating:
//!
//! ```text
//! {metric_name}#{timestamp}#{sha256(sorted "k=v" pairs joined by "-")}
//! ```
//!
//! Logs and spans carry no label set suitable for hashing, so their
//! identifiers combine the record timestamp with a random disambiguator.
//! Those are unique within a batch but not idempotent across retries.

use crate::models::{LogRecord, MetricSample, Span};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Separator between `key=value` pairs in the hashed label string.
const LABEL_SEPARATOR: &str = "-";

/// Builds the canonical label string: `key=value` pairs sorted by key.
///
/// # Example
///
/// ```
/// use shared::identity::canonical_label_string;
/// use std::collections::BTreeMap;
///
/// let labels = BTreeMap::from([
///     ("job".to_string(), "node".to_string()),
///     ("__name__".to_string(), "up".to_string()),
/// ]);
/// assert_eq!(canonical_label_string(&labels), "__name__=up-job=node");
/// ```
#[must_use]
pub fn canonical_label_string<'a, I>(labels: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut pairs: Vec<String> = labels
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    pairs.sort();
    pairs.join(LABEL_SEPARATOR)
}

/// Lowercase hex SHA-256 of the canonical label string.
#[must_use]
pub fn label_digest(sample: &MetricSample) -> String {
    let digest = Sha256::digest(canonical_label_string(&sample.labels).as_bytes());
    hex::encode(digest)
}

/// Content-addressed identifier for a metric sample.
///
/// The timestamp is rendered at the precision it was decoded with.
#[must_use]
pub fn metric_identifier(sample: &MetricSample) -> String {
    format!(
        "{}#{}#{}",
        sample.name(),
        sample.timestamp,
        label_digest(sample)
    )
}

/// Identifier for a log record: timestamp plus a random disambiguator.
#[must_use]
pub fn log_identifier(record: &LogRecord) -> String {
    format!("log#{}#{}", record.timestamp, Uuid::new_v4().simple())
}

/// Identifier for a span: start time plus a random disambiguator.
#[must_use]
pub fn span_identifier(span: &Span) -> String {
    format!("span#{}#{}", span.start_time, Uuid::new_v4().simple())
}
