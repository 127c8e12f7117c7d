//! Conversions from OTLP messages into the canonical Edgewatch records.
//!
//! Attributes are flattened to strings: the canonical model only carries
//! string maps. Resource attributes are merged under record attributes, so a
//! record-level key wins over a resource-level one.

use crate::decode::tenant::{tenant_from_labels, TenantTracker};
use crate::models::{
    LogLevel, LogRecord, MetricSample, Span, SpanEvent, SpanStatusCode, SpanValidationError,
    METRIC_NAME_LABEL,
};
use crate::otlp::proto;
use std::collections::BTreeMap;

/// Records converted from one export request.
#[derive(Debug, Clone, PartialEq)]
pub struct Converted<T> {
    /// Records that converted successfully.
    pub records: Vec<T>,
    /// Number of records dropped during conversion.
    pub rejected: usize,
    /// Last tenant seen while converting; only used for log lines.
    pub current_tenant: String,
}

/// Splits OTLP nanoseconds into fractional seconds without losing the
/// whole-second part to float rounding.
#[allow(clippy::cast_precision_loss)]
fn nanos_to_seconds(nanos: u64) -> f64 {
    (nanos / 1_000_000_000) as f64 + (nanos % 1_000_000_000) as f64 / 1e9
}

fn nanos_to_i64(nanos: u64) -> i64 {
    i64::try_from(nanos).unwrap_or(i64::MAX)
}

/// Renders an OTLP `AnyValue` as a string.
///
/// Strings are returned verbatim; composite values are rendered as JSON.
#[must_use]
pub fn any_value_to_string(value: &proto::common::v1::AnyValue) -> String {
    use proto::common::v1::any_value::Value;

    match &value.value {
        Some(Value::StringValue(s)) => s.clone(),
        Some(Value::BoolValue(b)) => b.to_string(),
        Some(Value::IntValue(i)) => i.to_string(),
        Some(Value::DoubleValue(d)) => d.to_string(),
        Some(Value::BytesValue(b)) => hex::encode(b),
        Some(_) => any_value_to_json(value).to_string(),
        None => String::new(),
    }
}

fn any_value_to_json(value: &proto::common::v1::AnyValue) -> serde_json::Value {
    use proto::common::v1::any_value::Value;

    match &value.value {
        Some(Value::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(Value::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(Value::IntValue(i)) => serde_json::Value::Number((*i).into()),
        Some(Value::DoubleValue(d)) => serde_json::Number::from_f64(*d)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Some(Value::ArrayValue(arr)) => {
            serde_json::Value::Array(arr.values.iter().map(any_value_to_json).collect())
        }
        Some(Value::KvlistValue(kv)) => {
            let mut map = serde_json::Map::new();
            for pair in &kv.values {
                if let Some(ref v) = pair.value {
                    map.insert(pair.key.clone(), any_value_to_json(v));
                }
            }
            serde_json::Value::Object(map)
        }
        Some(Value::BytesValue(b)) => serde_json::Value::String(hex::encode(b)),
        None => serde_json::Value::Null,
    }
}

/// Converts OTLP key-value pairs to a string map.
#[must_use]
pub fn key_values_to_map(attributes: &[proto::common::v1::KeyValue]) -> BTreeMap<String, String> {
    attributes
        .iter()
        .filter_map(|kv| {
            kv.value
                .as_ref()
                .map(|v| (kv.key.clone(), any_value_to_string(v)))
        })
        .collect()
}

/// Extracts resource attributes as a string map.
#[must_use]
pub fn resource_attributes(
    resource: Option<&proto::resource::v1::Resource>,
) -> BTreeMap<String, String> {
    resource
        .map(|r| key_values_to_map(&r.attributes))
        .unwrap_or_default()
}

fn merged(
    resource_attrs: &BTreeMap<String, String>,
    attributes: &[proto::common::v1::KeyValue],
) -> BTreeMap<String, String> {
    let mut merged = resource_attrs.clone();
    merged.extend(key_values_to_map(attributes));
    merged
}

/// Converts one OTLP metric into canonical samples.
///
/// Gauge and sum data points become one sample each; integer points are
/// widened to `f64`. Points without a value are skipped.
#[must_use]
pub fn otlp_metric_to_samples(
    metric: &proto::metrics::v1::Metric,
    resource_attrs: &BTreeMap<String, String>,
) -> Vec<MetricSample> {
    use proto::metrics::v1::metric::Data;
    use proto::metrics::v1::number_data_point::Value;

    let points = match &metric.data {
        Some(Data::Gauge(gauge)) => &gauge.data_points,
        Some(Data::Sum(sum)) => &sum.data_points,
        None => {
            tracing::debug!(metric = %metric.name, "Skipping metric without gauge or sum data");
            return Vec::new();
        }
    };

    points
        .iter()
        .filter_map(|point| {
            #[allow(clippy::cast_precision_loss)]
            let value = match point.value.as_ref()? {
                Value::AsDouble(v) => *v,
                Value::AsInt(v) => *v as f64,
            };
            let mut labels = merged(resource_attrs, &point.attributes);
            labels.insert(METRIC_NAME_LABEL.to_string(), metric.name.clone());
            let tenant_id = tenant_from_labels(&labels);
            Some(MetricSample {
                labels,
                timestamp: nanos_to_seconds(point.time_unix_nano),
                value,
                tenant_id,
            })
        })
        .collect()
}

/// Converts an OTLP log record.
///
/// Severity comes from `severity_text`, falling back to the level named by
/// `severity_number`. The timestamp falls back to the observed time.
#[must_use]
pub fn otlp_log_to_record(
    log_record: &proto::logs::v1::LogRecord,
    resource_attrs: &BTreeMap<String, String>,
) -> LogRecord {
    let nanos = if log_record.time_unix_nano > 0 {
        log_record.time_unix_nano
    } else {
        log_record.observed_time_unix_nano
    };

    let severity = if log_record.severity_text.is_empty() {
        LogLevel::from_severity_number(log_record.severity_number).to_string()
    } else {
        log_record.severity_text.clone()
    };

    let body = log_record
        .body
        .as_ref()
        .map(any_value_to_string)
        .unwrap_or_default();

    let mut attributes = merged(resource_attrs, &log_record.attributes);
    if !log_record.trace_id.is_empty() {
        attributes.insert("trace_id".to_string(), hex::encode(&log_record.trace_id));
    }
    if !log_record.span_id.is_empty() {
        attributes.insert("span_id".to_string(), hex::encode(&log_record.span_id));
    }
    let tenant_id = tenant_from_labels(&attributes);

    LogRecord {
        timestamp: nanos_to_i64(nanos),
        severity,
        body,
        attributes,
        tenant_id,
    }
}

/// Converts an OTLP span.
///
/// # Errors
///
/// Returns an error if the ids have the wrong width or the span ends before
/// it starts.
pub fn otlp_span_to_span(
    span: &proto::trace::v1::Span,
    resource_attrs: &BTreeMap<String, String>,
) -> Result<Span, SpanValidationError> {
    let attributes = merged(resource_attrs, &span.attributes);
    let tenant_id = tenant_from_labels(&attributes);

    let events = span
        .events
        .iter()
        .map(|event| SpanEvent {
            name: event.name.clone(),
            timestamp: nanos_to_i64(event.time_unix_nano),
            attributes: key_values_to_map(&event.attributes),
        })
        .collect();

    let converted = Span {
        trace_id: span.trace_id.clone(),
        span_id: span.span_id.clone(),
        parent_span_id: span.parent_span_id.clone(),
        name: span.name.clone(),
        start_time: nanos_to_i64(span.start_time_unix_nano),
        end_time: nanos_to_i64(span.end_time_unix_nano),
        status_code: span
            .status
            .as_ref()
            .map_or(SpanStatusCode::Unset, |s| SpanStatusCode::from_code(s.code)),
        attributes,
        events,
        tenant_id,
    };

    converted.validate_span()?;
    Ok(converted)
}

/// Converts a metrics export request.
///
/// Samples that end up without a name are dropped and counted as rejected.
#[must_use]
pub fn convert_metrics_request(
    request: &proto::collector::metrics::v1::ExportMetricsServiceRequest,
) -> Converted<MetricSample> {
    let mut tracker = TenantTracker::default();
    let mut records = Vec::new();
    let mut rejected = 0;

    for resource_metrics in &request.resource_metrics {
        let resource_attrs = resource_attributes(resource_metrics.resource.as_ref());
        for scope_metrics in &resource_metrics.scope_metrics {
            for metric in &scope_metrics.metrics {
                for sample in otlp_metric_to_samples(metric, &resource_attrs) {
                    if sample.validate_sample().is_err() {
                        rejected += 1;
                        continue;
                    }
                    tracker.observe(&sample.tenant_id);
                    records.push(sample);
                }
            }
        }
    }

    Converted {
        records,
        rejected,
        current_tenant: tracker.into_current(),
    }
}

/// Converts a logs export request.
#[must_use]
pub fn convert_logs_request(
    request: &proto::collector::logs::v1::ExportLogsServiceRequest,
) -> Converted<LogRecord> {
    let mut tracker = TenantTracker::default();
    let mut records = Vec::new();

    for resource_logs in &request.resource_logs {
        let resource_attrs = resource_attributes(resource_logs.resource.as_ref());
        for scope_logs in &resource_logs.scope_logs {
            for log_record in &scope_logs.log_records {
                let record = otlp_log_to_record(log_record, &resource_attrs);
                tracker.observe(&record.tenant_id);
                records.push(record);
            }
        }
    }

    Converted {
        records,
        rejected: 0,
        current_tenant: tracker.into_current(),
    }
}

/// Converts a trace export request.
///
/// Invalid spans are dropped and counted as rejected.
#[must_use]
pub fn convert_trace_request(
    request: &proto::collector::trace::v1::ExportTraceServiceRequest,
) -> Converted<Span> {
    let mut tracker = TenantTracker::default();
    let mut records = Vec::new();
    let mut rejected = 0;

    for resource_spans in &request.resource_spans {
        let resource_attrs = resource_attributes(resource_spans.resource.as_ref());
        for scope_spans in &resource_spans.scope_spans {
            for span in &scope_spans.spans {
                match otlp_span_to_span(span, &resource_attrs) {
                    Ok(converted) => {
                        tracker.observe(&converted.tenant_id);
                        records.push(converted);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, span = %span.name, "Dropping invalid span");
                        rejected += 1;
                    }
                }
            }
        }
    }

    Converted {
        records,
        rejected,
        current_tenant: tracker.into_current(),
    }
}
