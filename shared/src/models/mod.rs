//! Canonical data models for Edgewatch.
//!
//! Every wire dialect converges to these shapes: metric samples, log
//! records and spans, plus the transient anomalies the detector produces.

pub mod anomaly;
pub mod batch;
pub mod log;
pub mod metric;
pub mod trace;

pub use anomaly::Anomaly;
pub use batch::TelemetryBatch;
pub use log::{LogLevel, LogRecord};
pub use metric::{MetricSample, SampleValidationError, METRIC_NAME_LABEL, UNKNOWN};
pub use trace::{Span, SpanEvent, SpanStatusCode, SpanValidationError, SPAN_ID_LEN, TRACE_ID_LEN};
