//! Integration tests for request handling: credentials, envelopes, storage
//! and the ingestion summary.

use axum::http::StatusCode;
use base64::Engine;
use prost::Message;
use serde_json::json;
use shared::decode::remote_write::{Label, Sample, TimeSeries, WriteRequest};
use shared::storage::{ItemBody, ItemKind, TelemetryStore};

use super::common::{
    failing_app, partially_failing_app, post_json, post_raw, post_unauthenticated, series_body,
    test_app, EDGE_1_CHAT,
};

const INGEST_PATHS: [&str; 6] = [
    "/",
    "/ingest",
    "/api/v1/write",
    "/v1/metrics",
    "/v1/logs",
    "/v1/traces",
];

fn remote_write_body() -> Vec<u8> {
    let request = WriteRequest {
        timeseries: vec![TimeSeries {
            labels: vec![
                Label {
                    name: "__name__".to_string(),
                    value: "node_load1".to_string(),
                },
                Label {
                    name: "cluster_id".to_string(),
                    value: "edge-1".to_string(),
                },
                Label {
                    name: "instance".to_string(),
                    value: "10.0.0.7:9100".to_string(),
                },
            ],
            samples: vec![
                Sample {
                    value: 0.1 + 0.2,
                    timestamp: 1_700_000_000_123,
                },
                Sample {
                    value: 1.5e-7,
                    timestamp: 1_700_000_001_000,
                },
            ],
        }],
    };
    request.encode_to_vec()
}

fn snappy(body: &[u8]) -> Vec<u8> {
    snap::raw::Encoder::new().compress_vec(body).unwrap()
}

#[tokio::test]
async fn test_empty_body_is_rejected_without_credentials() {
    let app = test_app();

    let (status, response) = post_unauthenticated(app.router, "/ingest", &[], Vec::new()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], 400);
    assert_eq!(app.store.batch_put_calls(), 0);
}

#[tokio::test]
async fn test_empty_body_is_rejected_on_every_path_regardless_of_headers() {
    for path in INGEST_PATHS {
        let app = test_app();

        let (status, response) = post_raw(
            app.router.clone(),
            path,
            &[("content-type", "application/x-protobuf")],
            Vec::new(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path} with valid key");
        assert_eq!(response["code"], 400);

        let (status, _) = post_unauthenticated(
            app.router,
            path,
            &[("x-api-key", "wrong"), ("content-encoding", "snappy")],
            Vec::new(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path} with wrong key");

        assert_eq!(app.store.batch_put_calls(), 0, "{path}");
    }
}

#[tokio::test]
async fn test_wrong_key_is_forbidden_and_never_stores() {
    let app = test_app();
    let body = serde_json::to_vec(&series_body("edge-1", &[("cpu_pct", &[1.0, 2.0])])).unwrap();

    let (status, response) = post_unauthenticated(
        app.router.clone(),
        "/ingest",
        &[("x-api-key", "wrong")],
        body.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(response["code"], 403);

    let (status, _) = post_unauthenticated(app.router, "/ingest", &[], body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(app.store.batch_put_calls(), 0);
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_remote_write_round_trip_is_bit_exact() {
    let app = test_app();

    let (status, response) = post_raw(
        app.router,
        "/api/v1/write",
        &[
            ("content-type", "application/x-protobuf"),
            ("content-encoding", "snappy"),
        ],
        snappy(&remote_write_body()),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["status"], "success");
    assert_eq!(response["dialect"], "remote_write");
    assert_eq!(response["accepted"], 2);
    assert_eq!(response["rejected"], 0);

    let items = app
        .store
        .query_partition(ItemKind::Metric, "edge-1", 10)
        .await
        .unwrap();
    assert_eq!(items.len(), 2);

    let values: Vec<u64> = items
        .iter()
        .map(|item| match &item.body {
            ItemBody::Metric(m) => m.value.to_bits(),
            other => panic!("unexpected item {other:?}"),
        })
        .collect();
    assert!(values.contains(&(0.1_f64 + 0.2).to_bits()));
    assert!(values.contains(&1.5e-7_f64.to_bits()));

    // Newest first
    assert!(items[0].timestamp_secs() > items[1].timestamp_secs());
    let ItemBody::Metric(newest) = &items[0].body else {
        panic!("expected a metric");
    };
    assert_eq!(newest.instance, "10.0.0.7:9100");
    assert_eq!(newest.metric_name, "node_load1");
}

#[tokio::test]
async fn test_remote_write_is_detected_without_pinning() {
    let app = test_app();

    let (status, response) = post_raw(
        app.router,
        "/",
        &[("content-encoding", "snappy")],
        snappy(&remote_write_body()),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["dialect"], "remote_write");
}

#[tokio::test]
async fn test_redelivery_is_idempotent() {
    let app = test_app();
    let body = snappy(&remote_write_body());

    for _ in 0..2 {
        let (status, _) = post_raw(
            app.router.clone(),
            "/api/v1/write",
            &[("content-encoding", "snappy")],
            body.clone(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.store.len().unwrap(), 2);
    assert_eq!(app.store.batch_put_calls(), 2);
}

#[tokio::test]
async fn test_base64_envelope() {
    let app = test_app();
    let encoded = base64::engine::general_purpose::STANDARD.encode(snappy(&remote_write_body()));

    let (status, response) = post_raw(
        app.router.clone(),
        "/ingest",
        &[("x-is-base64-encoded", "true"), ("content-encoding", "snappy")],
        encoded.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["accepted"], 2);

    let (status, _) = post_raw(
        app.router,
        "/ingest",
        &[("x-body-encoding", "base64"), ("content-encoding", "snappy")],
        encoded,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_base64_is_malformed() {
    let app = test_app();

    let (status, response) = post_raw(
        app.router,
        "/ingest",
        &[("x-body-encoding", "base64")],
        "not base64 at all!!",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["message"]
        .as_str()
        .unwrap()
        .contains("Invalid base64"));
    assert_eq!(app.store.batch_put_calls(), 0);
}

#[tokio::test]
async fn test_invalid_snappy_is_malformed() {
    let app = test_app();

    let (status, response) = post_raw(
        app.router,
        "/api/v1/write",
        &[("content-encoding", "snappy")],
        vec![0xff, 0xff, 0xff, 0xff, 0xff],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["message"]
        .as_str()
        .unwrap()
        .contains("Invalid snappy"));
}

#[tokio::test]
async fn test_unsupported_encoding_is_malformed() {
    let app = test_app();

    let (status, _) = post_raw(app.router, "/ingest", &[("content-encoding", "gzip")], "x").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_pinned_dialect_failure_is_malformed() {
    let app = test_app();

    let (status, response) =
        post_raw(app.router, "/api/v1/write", &[], vec![0x0a, 0xff, 0xff]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], 400);
}

#[tokio::test]
async fn test_unrecognized_body_is_ambiguous() {
    let app = test_app();

    let (status, response) = post_raw(app.router, "/ingest", &[], "hello there").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["message"]
        .as_str()
        .unwrap()
        .contains("Could not detect body format"));
}

#[tokio::test]
async fn test_unnamed_series_counted_as_rejected() {
    let app = test_app();
    let body = json!({
        "timeseries": [
            {"labels": {"__name__": "up", "cluster_id": "edge-1"},
             "samples": [{"timestamp_ms": 1000, "value": 1}]},
            {"labels": {"cluster_id": "edge-1"},
             "samples": [{"timestamp_ms": 1000, "value": 1}, {"timestamp_ms": 2000, "value": 2}]}
        ]
    });

    let (status, response) = post_json(app.router, "/ingest", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["accepted"], 1);
    assert_eq!(response["rejected"], 2);
}

#[tokio::test]
async fn test_total_storage_failure_is_500_without_alerts() {
    let (router, notifier) = failing_app();
    let body = series_body(
        "edge-1",
        &[("cpu_pct", &[10.0, 11.0, 9.0, 10.0, 200.0])],
    );

    let (status, response) = post_json(router, "/ingest", &body).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response["code"], 500);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_records_partitioned_by_their_own_cluster() {
    let app = test_app();
    let body = json!([
        {"metric": {"__name__": "up", "cluster_id": "edge-1"}, "value": [1700000000, "1"]},
        {"metric": {"__name__": "up", "cluster_id": "edge-2"}, "value": [1700000000, "1"]},
        {"metric": {"__name__": "up"}, "value": [1700000000, "1"]}
    ]);

    let (status, response) = post_json(app.router, "/ingest", &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["accepted"], 3);

    for partition in ["edge-1", "edge-2", "unknown"] {
        let items = app
            .store
            .query_partition(ItemKind::Metric, partition, 10)
            .await
            .unwrap();
        assert_eq!(items.len(), 1, "partition {partition}");
    }
}

#[tokio::test]
async fn test_partial_storage_failure_still_alerts() {
    let (router, notifier) = partially_failing_app();
    let body = series_body("edge-1", &[("cpu_pct", &[10.0, 11.0, 9.0, 10.0, 200.0])]);

    let (status, response) = post_json(router, "/ingest", &body).await;

    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["status"], "partial");
    assert_eq!(response["accepted"], 3);
    assert_eq!(response["rejected"], 2);
    assert_eq!(response["anomalies"], 1);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, EDGE_1_CHAT);
    assert!(sent[0].1.contains("value 200"));
}
