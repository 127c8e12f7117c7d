//! Integration tests for anomaly detection and alert dispatch through the
//! ingestion endpoints.

use axum::http::StatusCode;

use super::common::{post_json, series_body, test_app, EDGE_1_CHAT};

#[tokio::test]
async fn test_spike_triggers_one_alert() {
    let app = test_app();
    let body = series_body("edge-1", &[("cpu_pct", &[10.0, 11.0, 9.0, 10.0, 200.0])]);

    let (status, response) = post_json(app.router, "/ingest", &body).await;

    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["accepted"], 5);
    assert_eq!(response["anomalies"], 1);

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, EDGE_1_CHAT);
    assert!(sent[0].1.contains("`cpu_pct`"));
    assert!(sent[0].1.contains("value 200"));
    assert!(sent[0].1.contains("`node-a`"));
}

#[tokio::test]
async fn test_zero_mad_group_never_alerts() {
    let app = test_app();
    let body = series_body("edge-1", &[("cpu_pct", &[1.0, 1.0, 1.0, 1.0, 50.0])]);

    let (status, response) = post_json(app.router, "/ingest", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["anomalies"], 0);
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_counters_are_not_scored() {
    let app = test_app();
    let body = series_body(
        "edge-1",
        &[("http_requests_total", &[10.0, 11.0, 9.0, 10.0, 20_000.0])],
    );

    let (status, response) = post_json(app.router, "/ingest", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["accepted"], 5);
    assert_eq!(response["anomalies"], 0);
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_small_groups_are_not_scored() {
    let app = test_app();
    let body = series_body("edge-1", &[("cpu_pct", &[1.0, 1000.0])]);

    let (_, response) = post_json(app.router, "/ingest", &body).await;

    assert_eq!(response["anomalies"], 0);
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_one_message_groups_metrics() {
    let app = test_app();
    let body = series_body(
        "edge-1",
        &[
            ("cpu_pct", &[10.0, 11.0, 9.0, 10.0, 200.0]),
            ("mem_pct", &[40.0, 41.0, 39.0, 40.0, 99.0]),
        ],
    );

    let (_, response) = post_json(app.router, "/ingest", &body).await;

    assert_eq!(response["anomalies"], 2);
    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("`cpu_pct`"));
    assert!(sent[0].1.contains("`mem_pct`"));
}

#[tokio::test]
async fn test_tenant_without_target_still_succeeds() {
    let app = test_app();
    let body = series_body("edge-9", &[("cpu_pct", &[10.0, 11.0, 9.0, 10.0, 200.0])]);

    let (status, response) = post_json(app.router, "/ingest", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["anomalies"], 1);
    assert!(app.notifier.sent().is_empty());
}
