//! Log record data model.
//!
//! Defines the canonical `LogRecord` produced by the OTLP and text-log dialects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity level derived from an OTLP severity number.
///
/// The canonical record stores severity as free text; this enum only names
/// the standard buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Detailed debug information.
    Trace,
    /// Debug information.
    Debug,
    /// Informational messages.
    #[default]
    Info,
    /// Warning conditions.
    Warn,
    /// Error conditions.
    Error,
    /// Critical/fatal conditions.
    Fatal,
}

impl LogLevel {
    /// Maps an OTLP severity number to a level.
    ///
    /// See <https://opentelemetry.io/docs/specs/otel/logs/data-model/#field-severitynumber>.
    #[must_use]
    pub fn from_severity_number(severity: i32) -> Self {
        match severity {
            1..=4 => Self::Trace,
            5..=8 => Self::Debug,
            13..=16 => Self::Warn,
            17..=20 => Self::Error,
            21..=24 => Self::Fatal,
            _ => Self::Info,
        }
    }

    /// Recognizes a leading level word in free text (`"ERROR"`, `"warn"`, ...).
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        let word = word.trim_matches(|c: char| !c.is_ascii_alphabetic());
        match word.to_ascii_uppercase().as_str() {
            "TRACE" => Some(Self::Trace),
            "DEBUG" => Some(Self::Debug),
            "INFO" => Some(Self::Info),
            "WARN" | "WARNING" => Some(Self::Warn),
            "ERROR" | "ERR" => Some(Self::Error),
            "FATAL" | "CRITICAL" => Some(Self::Fatal),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "TRACE"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Fatal => write!(f, "FATAL"),
        }
    }
}

/// A single log event.
///
/// `timestamp` orders records within a batch only; it is not required to be
/// globally monotonic.
///
/// # Example
///
/// ```
/// use shared::models::LogRecord;
///
/// let log = LogRecord::new(1_700_000_000_000_000_000, "ERROR", "disk full")
///     .with_attribute("host", "node-a")
///     .with_tenant("cluster-1");
///
/// assert_eq!(log.tenant_id, "cluster-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Nanoseconds since the Unix epoch.
    pub timestamp: i64,

    /// Free-text severity.
    pub severity: String,

    /// The log message.
    pub body: String,

    /// Additional attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Tenant/cluster the record belongs to.
    pub tenant_id: String,
}

impl LogRecord {
    /// Creates a new log record for the `"unknown"` tenant.
    #[must_use]
    pub fn new(timestamp: i64, severity: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            timestamp,
            severity: severity.into(),
            body: body.into(),
            attributes: BTreeMap::new(),
            tenant_id: super::UNKNOWN.to_string(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Sets the owning tenant.
    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = tenant_id.into();
        self
    }

    /// Returns the timestamp as a `DateTime<Utc>`.
    #[must_use]
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_number_mapping() {
        assert_eq!(LogLevel::from_severity_number(1), LogLevel::Trace);
        assert_eq!(LogLevel::from_severity_number(5), LogLevel::Debug);
        assert_eq!(LogLevel::from_severity_number(9), LogLevel::Info);
        assert_eq!(LogLevel::from_severity_number(13), LogLevel::Warn);
        assert_eq!(LogLevel::from_severity_number(17), LogLevel::Error);
        assert_eq!(LogLevel::from_severity_number(21), LogLevel::Fatal);
        assert_eq!(LogLevel::from_severity_number(0), LogLevel::Info);
        assert_eq!(LogLevel::from_severity_number(99), LogLevel::Info);
    }

    #[test]
    fn test_keyword_detection() {
        assert_eq!(LogLevel::from_keyword("ERROR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::from_keyword("[warn]"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_keyword("Warning:"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_keyword("hello"), None);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(LogLevel::Error.to_string(), "ERROR");
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
    }

    #[test]
    fn test_datetime_conversion() {
        let log = LogRecord::new(1_700_000_000_000_000_000, "INFO", "hi");
        assert_eq!(log.datetime().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_log_record_roundtrip() {
        let original = LogRecord::new(42, "WARN", "Roundtrip test")
            .with_attribute("key", "value")
            .with_tenant("c1");

        let json = serde_json::to_string(&original).unwrap();
        let deserialized: LogRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(original, deserialized);
    }
}
