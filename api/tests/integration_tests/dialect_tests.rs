//! Integration tests for each wire dialect through its endpoint.

use axum::http::StatusCode;
use prost::Message;
use serde_json::json;
use shared::otlp::proto;
use shared::storage::{ItemBody, ItemKind, TelemetryStore};

use super::common::{post_json, post_raw, test_app};

fn string_kv(key: &str, value: &str) -> proto::common::v1::KeyValue {
    proto::common::v1::KeyValue {
        key: key.to_string(),
        value: Some(proto::common::v1::AnyValue {
            value: Some(proto::common::v1::any_value::Value::StringValue(
                value.to_string(),
            )),
        }),
    }
}

#[tokio::test]
async fn test_otlp_json_logs() {
    let app = test_app();
    let body = json!({
        "resourceLogs": [{
            "resource": {"attributes": [
                {"key": "cluster_id", "value": {"stringValue": "edge-1"}}
            ]},
            "scopeLogs": [{
                "logRecords": [{
                    "timeUnixNano": "1700000000000000000",
                    "severityNumber": 17,
                    "body": {"stringValue": "disk full"},
                    "attributes": [{"key": "mount", "value": {"stringValue": "/var"}}],
                    "traceId": "0102030405060708090a0b0c0d0e0f10"
                }]
            }]
        }]
    });

    let (status, response) = post_json(app.router, "/v1/logs", &body).await;

    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["dialect"], "otlp_logs_json");
    assert_eq!(response["accepted"], 1);
    assert_eq!(response["anomalies"], 0);

    let items = app
        .store
        .query_partition(ItemKind::Log, "edge-1", 10)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    let ItemBody::Log(log) = &items[0].body else {
        panic!("expected a log item");
    };
    assert_eq!(log.severity, "ERROR");
    assert_eq!(log.body, "disk full");
    assert_eq!(log.attributes["mount"], "/var");
    assert_eq!(
        log.attributes["trace_id"],
        "0102030405060708090a0b0c0d0e0f10"
    );
}

#[tokio::test]
async fn test_otlp_json_is_detected_without_pinning() {
    let app = test_app();
    let points: Vec<_> = [10.0, 11.0, 9.0, 10.0, 200.0]
        .iter()
        .enumerate()
        .map(|(i, v)| json!({"timeUnixNano": (1_700_000_000 + i as u64) * 1_000_000_000, "asDouble": v}))
        .collect();
    let body = json!({
        "resourceMetrics": [{
            "resource": {"attributes": [
                {"key": "service.name", "value": {"stringValue": "edge-1"}}
            ]},
            "scopeMetrics": [{
                "metrics": [{"name": "temp_c", "gauge": {"dataPoints": points}}]
            }]
        }]
    });

    let (status, response) = post_json(app.router, "/", &body).await;

    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["dialect"], "otlp_metrics_json");
    assert_eq!(response["accepted"], 5);
    assert_eq!(response["anomalies"], 1);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_otlp_protobuf_metrics() {
    let app = test_app();
    let request = proto::collector::metrics::v1::ExportMetricsServiceRequest {
        resource_metrics: vec![proto::metrics::v1::ResourceMetrics {
            resource: Some(proto::resource::v1::Resource {
                attributes: vec![string_kv("cluster_id", "edge-3")],
                dropped_attributes_count: 0,
            }),
            scope_metrics: vec![proto::metrics::v1::ScopeMetrics {
                metrics: vec![proto::metrics::v1::Metric {
                    name: "queue_depth".to_string(),
                    data: Some(proto::metrics::v1::metric::Data::Gauge(
                        proto::metrics::v1::Gauge {
                            data_points: vec![proto::metrics::v1::NumberDataPoint {
                                time_unix_nano: 1_700_000_000_000_000_000,
                                value: Some(
                                    proto::metrics::v1::number_data_point::Value::AsInt(7),
                                ),
                                ..Default::default()
                            }],
                        },
                    )),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
    };

    let (status, response) = post_raw(
        app.router,
        "/v1/metrics",
        &[("content-type", "application/x-protobuf")],
        request.encode_to_vec(),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["dialect"], "otlp_metrics_protobuf");

    let items = app
        .store
        .query_partition(ItemKind::Metric, "edge-3", 10)
        .await
        .unwrap();
    let ItemBody::Metric(metric) = &items[0].body else {
        panic!("expected a metric item");
    };
    assert_eq!(metric.metric_name, "queue_depth");
    assert!((metric.value - 7.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_otlp_protobuf_traces_reject_invalid_spans() {
    let app = test_app();
    let valid = proto::trace::v1::Span {
        trace_id: vec![0xab; 16],
        span_id: vec![0xcd; 8],
        name: "GET /users".to_string(),
        start_time_unix_nano: 1_700_000_000_000_000_000,
        end_time_unix_nano: 1_700_000_000_250_000_000,
        status: Some(proto::trace::v1::Status {
            message: String::new(),
            code: 2,
        }),
        ..Default::default()
    };
    let short_span_id = proto::trace::v1::Span {
        span_id: vec![1; 4],
        ..valid.clone()
    };
    let request = proto::collector::trace::v1::ExportTraceServiceRequest {
        resource_spans: vec![proto::trace::v1::ResourceSpans {
            resource: Some(proto::resource::v1::Resource {
                attributes: vec![string_kv("cluster_id", "edge-1")],
                dropped_attributes_count: 0,
            }),
            scope_spans: vec![proto::trace::v1::ScopeSpans {
                spans: vec![valid, short_span_id],
                ..Default::default()
            }],
            ..Default::default()
        }],
    };

    let (status, response) = post_raw(
        app.router,
        "/v1/traces",
        &[("content-type", "application/x-protobuf")],
        request.encode_to_vec(),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["accepted"], 1);
    assert_eq!(response["rejected"], 1);

    let items = app
        .store
        .query_partition(ItemKind::Span, "edge-1", 10)
        .await
        .unwrap();
    let ItemBody::Span(span) = &items[0].body else {
        panic!("expected a span item");
    };
    assert_eq!(span.trace_id, "ab".repeat(16));
    assert_eq!(span.status_code, "error");
    assert_eq!(span.duration(), 250_000_000);
}

#[tokio::test]
async fn test_text_log_lines() {
    let app = test_app();
    let body = "2024-03-01T12:00:00Z gw-01 sshd[4242]: ERROR authentication failure\n\
                2024-03-01 12:00:05 gw-01 kernel: link up\n";

    let (status, response) = post_raw(
        app.router,
        "/ingest",
        &[("content-type", "text/plain")],
        body,
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["dialect"], "text_log");
    assert_eq!(response["accepted"], 2);

    let items = app
        .store
        .query_partition(ItemKind::Log, "unknown", 10)
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    let severities: Vec<&str> = items
        .iter()
        .map(|item| match &item.body {
            ItemBody::Log(log) => log.severity.as_str(),
            _ => "",
        })
        .collect();
    assert!(severities.contains(&"ERROR"));
    assert!(severities.contains(&"INFO"));
}

#[tokio::test]
async fn test_otlp_json_endpoint_rejects_garbage() {
    let app = test_app();

    let (status, _) = post_raw(
        app.router,
        "/v1/logs",
        &[("content-type", "application/json")],
        "{not json",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}
