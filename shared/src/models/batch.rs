//! Canonical batch of decoded records.

use super::{LogRecord, MetricSample, Span};

/// One ingestion call's worth of canonical records.
///
/// A batch is homogeneous: every dialect decodes into exactly one signal.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryBatch {
    /// Metric samples.
    Metrics(Vec<MetricSample>),
    /// Log records.
    Logs(Vec<LogRecord>),
    /// Spans.
    Spans(Vec<Span>),
}

impl TelemetryBatch {
    /// Number of records in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Metrics(v) => v.len(),
            Self::Logs(v) => v.len(),
            Self::Spans(v) => v.len(),
        }
    }

    /// Returns true if the batch holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short signal name for log lines and responses.
    #[must_use]
    pub fn signal(&self) -> &'static str {
        match self {
            Self::Metrics(_) => "metrics",
            Self::Logs(_) => "logs",
            Self::Spans(_) => "traces",
        }
    }

    /// Metric samples, if this is a metric batch.
    #[must_use]
    pub fn samples(&self) -> Option<&[MetricSample]> {
        match self {
            Self::Metrics(v) => Some(v),
            _ => None,
        }
    }
}
