//! Span data model.
//!
//! Spans keep their trace and span identifiers as opaque byte sequences.
//! They are only rendered as lowercase hex at the storage boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use validator::Validate;

/// Width of an OTLP trace id in bytes.
pub const TRACE_ID_LEN: usize = 16;

/// Width of an OTLP span id in bytes.
pub const SPAN_ID_LEN: usize = 8;

/// Status code for a span, mirroring OTLP's `Status.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatusCode {
    /// No status was set.
    #[default]
    Unset,
    /// The operation completed successfully.
    Ok,
    /// The operation failed.
    Error,
}

impl SpanStatusCode {
    /// Maps the OTLP numeric code; unknown values fall back to `Unset`.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Ok,
            2 => Self::Error,
            _ => Self::Unset,
        }
    }
}

impl std::fmt::Display for SpanStatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, "unset"),
            Self::Ok => write!(f, "ok"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// An event within a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanEvent {
    /// The name of the event.
    pub name: String,
    /// Nanoseconds since the Unix epoch.
    pub timestamp: i64,
    /// Additional attributes for the event.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// A unit of work in a distributed trace.
///
/// `duration` is always derived from `end_time - start_time`.
///
/// # Example
///
/// ```
/// use shared::models::Span;
///
/// let span = Span::new(vec![1; 16], vec![2; 8], "GET /users")
///     .with_times(1_000, 4_000)
///     .with_attribute("http.method", "GET");
///
/// assert!(span.is_root());
/// assert_eq!(span.duration(), 3_000);
/// assert!(span.validate_span().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Span {
    /// Trace identifier bytes.
    #[validate(length(equal = 16, message = "Trace ID must be 16 bytes"))]
    pub trace_id: Vec<u8>,

    /// Span identifier bytes.
    #[validate(length(equal = 8, message = "Span ID must be 8 bytes"))]
    pub span_id: Vec<u8>,

    /// Parent span identifier; empty for a root span.
    #[serde(default)]
    pub parent_span_id: Vec<u8>,

    /// Operation name.
    pub name: String,

    /// Start time in nanoseconds since the Unix epoch.
    pub start_time: i64,

    /// End time in nanoseconds since the Unix epoch.
    pub end_time: i64,

    /// Outcome of the operation.
    #[serde(default)]
    pub status_code: SpanStatusCode,

    /// Additional attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Events recorded during the span.
    #[serde(default)]
    pub events: Vec<SpanEvent>,

    /// Tenant/cluster the span belongs to.
    pub tenant_id: String,
}

/// Errors that can occur during span validation.
#[derive(Debug, Error)]
pub enum SpanValidationError {
    /// The end time is before the start time.
    #[error("End time cannot be before start time")]
    InvalidTimeRange,

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl Span {
    /// Creates a root span with zero-length timing.
    #[must_use]
    pub fn new(trace_id: Vec<u8>, span_id: Vec<u8>, name: impl Into<String>) -> Self {
        Self {
            trace_id,
            span_id,
            parent_span_id: Vec::new(),
            name: name.into(),
            start_time: 0,
            end_time: 0,
            status_code: SpanStatusCode::default(),
            attributes: BTreeMap::new(),
            events: Vec::new(),
            tenant_id: super::UNKNOWN.to_string(),
        }
    }

    /// Sets the parent span id.
    #[must_use]
    pub fn with_parent(mut self, parent_span_id: Vec<u8>) -> Self {
        self.parent_span_id = parent_span_id;
        self
    }

    /// Sets start and end times (nanoseconds).
    #[must_use]
    pub fn with_times(mut self, start_time: i64, end_time: i64) -> Self {
        self.start_time = start_time;
        self.end_time = end_time;
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn with_status(mut self, status_code: SpanStatusCode) -> Self {
        self.status_code = status_code;
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Adds an event.
    #[must_use]
    pub fn with_event(mut self, name: impl Into<String>, timestamp: i64) -> Self {
        self.events.push(SpanEvent {
            name: name.into(),
            timestamp,
            attributes: BTreeMap::new(),
        });
        self
    }

    /// Sets the owning tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    /// Span duration in nanoseconds.
    #[must_use]
    pub fn duration(&self) -> i64 {
        self.end_time - self.start_time
    }

    /// Returns true if this is a root span.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_empty()
    }

    /// Lowercase hex trace id.
    #[must_use]
    pub fn trace_id_hex(&self) -> String {
        hex::encode(&self.trace_id)
    }

    /// Lowercase hex span id.
    #[must_use]
    pub fn span_id_hex(&self) -> String {
        hex::encode(&self.span_id)
    }

    /// Lowercase hex parent span id; empty string for a root span.
    #[must_use]
    pub fn parent_span_id_hex(&self) -> String {
        hex::encode(&self.parent_span_id)
    }

    /// Validates identifier widths and timing.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The end time is before the start time
    /// - The trace id is not 16 bytes or the span id is not 8 bytes
    pub fn validate_span(&self) -> Result<(), SpanValidationError> {
        if self.end_time < self.start_time {
            return Err(SpanValidationError::InvalidTimeRange);
        }
        self.validate()?;
        Ok(())
    }
}
