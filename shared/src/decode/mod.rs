//! Wire decoding: raw request bytes into canonical telemetry batches.
//!
//! Every dialect is a pure `fn(&[u8]) -> Result<DecodedBatch, DecodeError>`.
//! When the caller pins a dialect only that function runs and its failure is
//! final. Otherwise [`AUTO_CHAIN`] is tried in order and the first success
//! wins.
//!
//! Binary dialects refuse JSON-looking bodies, and in the chain a binary
//! decode that yields no records counts as a miss: protobuf parsing accepts
//! many byte strings as an empty message.
//!
//! # Example
//!
//! ```
//! use shared::decode::{decode, Dialect, FormatHint};
//!
//! let body = br#"{"timeseries":[{"labels":{"__name__":"up"},"samples":[{"timestamp_ms":1000,"value":1}]}]}"#;
//! let decoded = decode(body, FormatHint::Auto).unwrap();
//! assert_eq!(decoded.dialect, Dialect::PlainJson);
//! assert_eq!(decoded.batch.len(), 1);
//! ```

pub mod envelope;
pub mod otlp;
pub mod plain_json;
pub mod remote_write;
pub mod tenant;
pub mod text_log;

use crate::models::TelemetryBatch;
use serde::Serialize;
use thiserror::Error;

/// One wire encoding/schema this service can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Prometheus remote-write protobuf.
    RemoteWrite,
    /// OTLP metrics, protobuf encoding.
    OtlpMetricsProtobuf,
    /// OTLP logs, protobuf encoding.
    OtlpLogsProtobuf,
    /// OTLP traces, protobuf encoding.
    OtlpTracesProtobuf,
    /// OTLP metrics, JSON encoding.
    OtlpMetricsJson,
    /// OTLP logs, JSON encoding.
    OtlpLogsJson,
    /// OTLP traces, JSON encoding.
    OtlpTracesJson,
    /// Plain JSON time series.
    PlainJson,
    /// Free-text log lines.
    TextLog,
}

impl Dialect {
    /// Stable name used in responses and log lines.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoteWrite => "remote_write",
            Self::OtlpMetricsProtobuf => "otlp_metrics_protobuf",
            Self::OtlpLogsProtobuf => "otlp_logs_protobuf",
            Self::OtlpTracesProtobuf => "otlp_traces_protobuf",
            Self::OtlpMetricsJson => "otlp_metrics_json",
            Self::OtlpLogsJson => "otlp_logs_json",
            Self::OtlpTracesJson => "otlp_traces_json",
            Self::PlainJson => "plain_json",
            Self::TextLog => "text_log",
        }
    }

    /// Whether the dialect is a binary protobuf encoding.
    #[must_use]
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            Self::RemoteWrite
                | Self::OtlpMetricsProtobuf
                | Self::OtlpLogsProtobuf
                | Self::OtlpTracesProtobuf
        )
    }

    /// The decoder function for this dialect.
    #[must_use]
    pub fn decoder(self) -> DecodeFn {
        match self {
            Self::RemoteWrite => remote_write::decode,
            Self::OtlpMetricsProtobuf => otlp::metrics_protobuf,
            Self::OtlpLogsProtobuf => otlp::logs_protobuf,
            Self::OtlpTracesProtobuf => otlp::traces_protobuf,
            Self::OtlpMetricsJson => otlp::metrics_json,
            Self::OtlpLogsJson => otlp::logs_json,
            Self::OtlpTracesJson => otlp::traces_json,
            Self::PlainJson => plain_json::decode,
            Self::TextLog => text_log::decode,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful decode.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBatch {
    /// Dialect that produced the batch.
    pub dialect: Dialect,
    /// Canonical records, each tagged with its own tenant.
    pub batch: TelemetryBatch,
    /// Records dropped during decoding (unnamed samples, invalid spans).
    pub rejected: usize,
    /// Most recently seen tenant; for log lines only.
    pub current_tenant: String,
}

/// Errors raised while decoding a body.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is empty.
    #[error("Empty body")]
    Empty,

    /// The body is not in this dialect at all.
    #[error("not {dialect}: {reason}")]
    Mismatch {
        /// Dialect that was tried.
        dialect: Dialect,
        /// Why the body was refused.
        reason: String,
    },

    /// The body looked like this dialect but failed to decode.
    #[error("invalid {dialect}: {reason}")]
    Invalid {
        /// Dialect that was tried.
        dialect: Dialect,
        /// Parser error.
        reason: String,
    },

    /// No dialect in the detection chain accepted the body.
    #[error("Could not detect body format ({})", summarize(.0))]
    Exhausted(Vec<DecodeError>),
}

fn summarize(attempts: &[DecodeError]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl DecodeError {
    pub(crate) fn mismatch(dialect: Dialect, reason: impl std::fmt::Display) -> Self {
        Self::Mismatch {
            dialect,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid(dialect: Dialect, reason: impl std::fmt::Display) -> Self {
        Self::Invalid {
            dialect,
            reason: reason.to_string(),
        }
    }

    /// True when the detection chain was exhausted.
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Exhausted(_))
    }
}

/// A dialect decoder.
pub type DecodeFn = fn(&[u8]) -> Result<DecodedBatch, DecodeError>;

/// Dialects tried, in order, when no dialect is pinned.
pub const AUTO_CHAIN: &[(Dialect, DecodeFn)] = &[
    (Dialect::RemoteWrite, remote_write::decode),
    (Dialect::OtlpMetricsProtobuf, otlp::metrics_protobuf),
    (Dialect::OtlpLogsProtobuf, otlp::logs_protobuf),
    (Dialect::OtlpTracesProtobuf, otlp::traces_protobuf),
    (Dialect::OtlpMetricsJson, otlp::any_json),
    (Dialect::PlainJson, plain_json::decode),
    (Dialect::TextLog, text_log::decode),
];

/// How to pick the dialect for a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatHint {
    /// Try [`AUTO_CHAIN`] in order.
    #[default]
    Auto,
    /// Only try this dialect; failure is final.
    Pinned(Dialect),
}

/// Returns true when the first non-whitespace byte opens a JSON object or
/// array.
#[must_use]
pub fn looks_like_json(body: &[u8]) -> bool {
    matches!(body.trim_ascii_start().first(), Some(b'{' | b'['))
}

/// Decodes an unwrapped body.
///
/// # Errors
///
/// Returns [`DecodeError::Empty`] for an empty body, the pinned dialect's
/// error when pinned, or [`DecodeError::Exhausted`] when no dialect of the
/// chain accepts the body.
pub fn decode(body: &[u8], hint: FormatHint) -> Result<DecodedBatch, DecodeError> {
    if body.is_empty() {
        return Err(DecodeError::Empty);
    }

    match hint {
        FormatHint::Pinned(dialect) => dialect.decoder()(body),
        FormatHint::Auto => decode_chain(body, AUTO_CHAIN),
    }
}

/// Runs a detection chain over a body.
///
/// # Errors
///
/// Returns [`DecodeError::Exhausted`] listing every dialect's failure.
pub fn decode_chain(
    body: &[u8],
    chain: &[(Dialect, DecodeFn)],
) -> Result<DecodedBatch, DecodeError> {
    let mut attempts = Vec::with_capacity(chain.len());

    for (dialect, decoder) in chain {
        match decoder(body) {
            Ok(decoded) if dialect.is_binary() && decoded.batch.is_empty() => {
                tracing::trace!(dialect = %dialect, "Binary dialect decoded no records");
                attempts.push(DecodeError::mismatch(*dialect, "decoded no records"));
            }
            Ok(decoded) => {
                tracing::debug!(
                    dialect = %decoded.dialect,
                    records = decoded.batch.len(),
                    failed_attempts = attempts.len(),
                    "Detected body format"
                );
                return Ok(decoded);
            }
            Err(e) => {
                tracing::trace!(dialect = %dialect, error = %e, "Dialect did not match");
                attempts.push(e);
            }
        }
    }

    Err(DecodeError::Exhausted(attempts))
}
