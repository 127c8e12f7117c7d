//! OTLP dialects, protobuf and JSON.

use super::{looks_like_json, DecodeError, DecodedBatch, Dialect};
use crate::models::TelemetryBatch;
use crate::otlp::conversions::{
    convert_logs_request, convert_metrics_request, convert_trace_request, Converted,
};
use crate::otlp::proto::collector::{
    logs::v1::ExportLogsServiceRequest, metrics::v1::ExportMetricsServiceRequest,
    trace::v1::ExportTraceServiceRequest,
};
use prost::Message;

fn finish<T>(
    dialect: Dialect,
    converted: Converted<T>,
    wrap: fn(Vec<T>) -> TelemetryBatch,
) -> DecodedBatch {
    DecodedBatch {
        dialect,
        batch: wrap(converted.records),
        rejected: converted.rejected,
        current_tenant: converted.current_tenant,
    }
}

fn decode_protobuf<M: Message + Default>(dialect: Dialect, body: &[u8]) -> Result<M, DecodeError> {
    if looks_like_json(body) {
        return Err(DecodeError::mismatch(dialect, "body is JSON"));
    }
    M::decode(body).map_err(|e| DecodeError::invalid(dialect, e))
}

/// Decodes a protobuf `ExportMetricsServiceRequest`.
///
/// # Errors
///
/// Returns an error if the body is JSON or not a valid message.
pub fn metrics_protobuf(body: &[u8]) -> Result<DecodedBatch, DecodeError> {
    let dialect = Dialect::OtlpMetricsProtobuf;
    let request: ExportMetricsServiceRequest = decode_protobuf(dialect, body)?;
    Ok(finish(
        dialect,
        convert_metrics_request(&request),
        TelemetryBatch::Metrics,
    ))
}

/// Decodes a protobuf `ExportLogsServiceRequest`.
///
/// # Errors
///
/// Returns an error if the body is JSON or not a valid message.
pub fn logs_protobuf(body: &[u8]) -> Result<DecodedBatch, DecodeError> {
    let dialect = Dialect::OtlpLogsProtobuf;
    let request: ExportLogsServiceRequest = decode_protobuf(dialect, body)?;
    Ok(finish(dialect, convert_logs_request(&request), TelemetryBatch::Logs))
}

/// Decodes a protobuf `ExportTraceServiceRequest`.
///
/// # Errors
///
/// Returns an error if the body is JSON or not a valid message.
pub fn traces_protobuf(body: &[u8]) -> Result<DecodedBatch, DecodeError> {
    let dialect = Dialect::OtlpTracesProtobuf;
    let request: ExportTraceServiceRequest = decode_protobuf(dialect, body)?;
    Ok(finish(dialect, convert_trace_request(&request), TelemetryBatch::Spans))
}

/// Decodes an OTLP/JSON metrics export.
///
/// # Errors
///
/// Returns an error if the body is not an OTLP/JSON metrics export.
pub fn metrics_json(body: &[u8]) -> Result<DecodedBatch, DecodeError> {
    let dialect = Dialect::OtlpMetricsJson;
    let request: ExportMetricsServiceRequest =
        serde_json::from_slice(body).map_err(|e| DecodeError::invalid(dialect, e))?;
    Ok(finish(
        dialect,
        convert_metrics_request(&request),
        TelemetryBatch::Metrics,
    ))
}

/// Decodes an OTLP/JSON logs export.
///
/// # Errors
///
/// Returns an error if the body is not an OTLP/JSON logs export.
pub fn logs_json(body: &[u8]) -> Result<DecodedBatch, DecodeError> {
    let dialect = Dialect::OtlpLogsJson;
    let request: ExportLogsServiceRequest =
        serde_json::from_slice(body).map_err(|e| DecodeError::invalid(dialect, e))?;
    Ok(finish(dialect, convert_logs_request(&request), TelemetryBatch::Logs))
}

/// Decodes an OTLP/JSON trace export.
///
/// # Errors
///
/// Returns an error if the body is not an OTLP/JSON trace export.
pub fn traces_json(body: &[u8]) -> Result<DecodedBatch, DecodeError> {
    let dialect = Dialect::OtlpTracesJson;
    let request: ExportTraceServiceRequest =
        serde_json::from_slice(body).map_err(|e| DecodeError::invalid(dialect, e))?;
    Ok(finish(dialect, convert_trace_request(&request), TelemetryBatch::Spans))
}

/// Decodes any OTLP/JSON export, selecting the signal by its top-level key.
///
/// # Errors
///
/// Returns a mismatch when no `resourceMetrics`, `resourceLogs` or
/// `resourceSpans` key is present, otherwise the signal decoder's error.
pub fn any_json(body: &[u8]) -> Result<DecodedBatch, DecodeError> {
    let probe: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(body)
        .map_err(|e| DecodeError::mismatch(Dialect::OtlpMetricsJson, e))?;

    if probe.contains_key("resourceMetrics") {
        metrics_json(body)
    } else if probe.contains_key("resourceLogs") {
        logs_json(body)
    } else if probe.contains_key("resourceSpans") {
        traces_json(body)
    } else {
        Err(DecodeError::mismatch(
            Dialect::OtlpMetricsJson,
            "no resourceMetrics, resourceLogs or resourceSpans key",
        ))
    }
}
