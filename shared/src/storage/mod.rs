//! Durable storage of canonical records.
//!
//! Every record is persisted as a [`StoredItem`] under a composite key:
//! the tenant id as partition key and an identity-builder id as sort key.
//! Items are immutable once written and carry an absolute `ttl` after which
//! the store may reclaim them; the application never deletes.
//!
//! The [`TelemetryStore`] trait is the seam to the backing store. Two
//! implementations ship: [`InMemoryStore`] for development and tests, and
//! [`ClickHouseStore`] for production.

pub mod clickhouse;
pub mod memory;
pub mod writer;

pub use self::clickhouse::{ClickHouseStore, RetryPolicy, TableNames, DEFAULT_CLICKHOUSE_BATCH_SIZE};
pub use memory::InMemoryStore;
pub use writer::{FailedRecord, StorageWriter, WriteReport, DEFAULT_WRITE_CONCURRENCY};

use crate::identity::{log_identifier, metric_identifier, span_identifier};
use crate::models::{LogRecord, MetricSample, Span, SpanEvent, TelemetryBatch};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Default number of items per batch-put call for stores without their own
/// limit, including the in-memory store.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 25;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on store")]
    LockError,

    /// The backing store rejected or failed the operation.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// An item body could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<::clickhouse::error::Error> for StoreError {
    fn from(e: ::clickhouse::error::Error) -> Self {
        Self::StorageError(e.to_string())
    }
}

/// Record kind; each kind lives in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Metric samples.
    Metric,
    /// Log records.
    Log,
    /// Spans.
    Span,
}

impl ItemKind {
    /// Lowercase kind name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Log => "log",
            Self::Span => "span",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "metric" | "metrics" => Ok(Self::Metric),
            "log" | "logs" => Ok(Self::Log),
            "span" | "spans" | "trace" | "traces" => Ok(Self::Span),
            other => Err(format!(
                "Unknown item kind '{other}'. Expected 'metric', 'log', or 'span'"
            )),
        }
    }
}

/// Stored attributes of a metric sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricItem {
    /// Value of the `__name__` label.
    pub metric_name: String,
    /// Full label set, including `__name__`.
    pub labels: BTreeMap<String, String>,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Sample value.
    pub value: f64,
    /// `instance` label or `"unknown"`.
    pub instance: String,
    /// `job` label or `"unknown"`.
    pub job: String,
}

/// Stored attributes of a log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogItem {
    /// Nanoseconds since the Unix epoch.
    pub timestamp: i64,
    /// Free-text severity.
    pub severity: String,
    /// Message body.
    pub body: String,
    /// Attributes.
    pub attributes: BTreeMap<String, String>,
}

/// Stored attributes of a span. Ids are lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanItem {
    /// Hex trace id.
    pub trace_id: String,
    /// Hex span id.
    pub span_id: String,
    /// Hex parent span id; empty for a root span.
    pub parent_span_id: String,
    /// Operation name.
    pub name: String,
    /// Start time in nanoseconds.
    pub start_time: i64,
    /// End time in nanoseconds.
    pub end_time: i64,
    /// `unset`, `ok` or `error`.
    pub status_code: String,
    /// Attributes.
    pub attributes: BTreeMap<String, String>,
    /// Events.
    pub events: Vec<SpanEvent>,
}

impl SpanItem {
    /// Duration in nanoseconds, derived from the stored times.
    #[must_use]
    pub fn duration(&self) -> i64 {
        self.end_time - self.start_time
    }
}

/// Item attributes, by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemBody {
    /// A metric sample.
    Metric(MetricItem),
    /// A log record.
    Log(LogItem),
    /// A span.
    Span(SpanItem),
}

/// The persistence record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    /// Tenant/cluster id.
    pub partition_key: String,
    /// Record identifier from the identity builder.
    pub sort_key: String,
    /// Epoch seconds after which the store may reclaim the item.
    pub ttl: i64,
    /// Source attributes.
    pub body: ItemBody,
}

impl StoredItem {
    /// Builds the item for a metric sample.
    #[must_use]
    pub fn from_sample(sample: &MetricSample, ttl: i64) -> Self {
        Self {
            partition_key: sample.tenant_id.clone(),
            sort_key: metric_identifier(sample),
            ttl,
            body: ItemBody::Metric(MetricItem {
                metric_name: sample.name().to_string(),
                labels: sample.labels.clone(),
                timestamp: sample.timestamp,
                value: sample.value,
                instance: sample.instance().to_string(),
                job: sample.job().to_string(),
            }),
        }
    }

    /// Builds the item for a log record.
    #[must_use]
    pub fn from_log(record: &LogRecord, ttl: i64) -> Self {
        Self {
            partition_key: record.tenant_id.clone(),
            sort_key: log_identifier(record),
            ttl,
            body: ItemBody::Log(LogItem {
                timestamp: record.timestamp,
                severity: record.severity.clone(),
                body: record.body.clone(),
                attributes: record.attributes.clone(),
            }),
        }
    }

    /// Builds the item for a span, rendering ids as hex.
    #[must_use]
    pub fn from_span(span: &Span, ttl: i64) -> Self {
        Self {
            partition_key: span.tenant_id.clone(),
            sort_key: span_identifier(span),
            ttl,
            body: ItemBody::Span(SpanItem {
                trace_id: span.trace_id_hex(),
                span_id: span.span_id_hex(),
                parent_span_id: span.parent_span_id_hex(),
                name: span.name.clone(),
                start_time: span.start_time,
                end_time: span.end_time,
                status_code: span.status_code.to_string(),
                attributes: span.attributes.clone(),
                events: span.events.clone(),
            }),
        }
    }

    /// Builds items for every record of a batch, preserving order.
    #[must_use]
    pub fn from_batch(batch: &TelemetryBatch, ttl: i64) -> Vec<Self> {
        match batch {
            TelemetryBatch::Metrics(samples) => {
                samples.iter().map(|s| Self::from_sample(s, ttl)).collect()
            }
            TelemetryBatch::Logs(records) => {
                records.iter().map(|r| Self::from_log(r, ttl)).collect()
            }
            TelemetryBatch::Spans(spans) => spans.iter().map(|s| Self::from_span(s, ttl)).collect(),
        }
    }

    /// Kind of the item.
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self.body {
            ItemBody::Metric(_) => ItemKind::Metric,
            ItemBody::Log(_) => ItemKind::Log,
            ItemBody::Span(_) => ItemKind::Span,
        }
    }

    /// Record time in seconds, used to order partition reads.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn timestamp_secs(&self) -> f64 {
        match &self.body {
            ItemBody::Metric(m) => m.timestamp,
            ItemBody::Log(l) => l.timestamp as f64 / 1e9,
            ItemBody::Span(s) => s.start_time as f64 / 1e9,
        }
    }

    /// Whether the item is past its TTL at `now` (epoch seconds).
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.ttl <= now
    }
}

/// Keyed durable store.
///
/// Implementations guarantee per-item atomicity only; a batch is not a
/// transaction. Writing an item whose key already exists replaces it.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Writes a group of items.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails; items of a failed call may or
    /// may not have landed.
    async fn batch_put(&self, items: &[StoredItem]) -> Result<(), StoreError>;

    /// Reads one item by its composite key. Expired items are not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn get(
        &self,
        kind: ItemKind,
        partition_key: &str,
        sort_key: &str,
    ) -> Result<Option<StoredItem>, StoreError>;

    /// Reads up to `limit` items of one partition, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    async fn query_partition(
        &self,
        kind: ItemKind,
        partition_key: &str,
        limit: usize,
    ) -> Result<Vec<StoredItem>, StoreError>;

    /// Largest number of items accepted by one `batch_put` call.
    fn max_batch_size(&self) -> usize {
        DEFAULT_MAX_BATCH_SIZE
    }
}
