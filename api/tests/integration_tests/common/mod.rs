//! Common test utilities and helpers for integration tests.
//!
//! Provides test app setup, a recording notifier, a failing store and HTTP
//! request helpers.

use api::{create_router, AppState, Config, API_KEY_HEADER, DEFAULT_API_KEY};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shared::alert::{AlertDispatcher, AlertError, Notifier, StaticTargets};
use shared::storage::{InMemoryStore, ItemKind, StoreError, StoredItem, TelemetryStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Chat id configured for the `edge-1` tenant.
pub const EDGE_1_CHAT: &str = "-1001";

/// Notifier that records every message instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// Messages sent so far, as `(target, text)`.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, target: &str, text: &str) -> Result<(), AlertError> {
        self.sent
            .lock()
            .unwrap()
            .push((target.to_string(), text.to_string()));
        Ok(())
    }
}

/// Store whose every write fails.
pub struct FailingStore;

#[async_trait]
impl TelemetryStore for FailingStore {
    async fn batch_put(&self, _items: &[StoredItem]) -> Result<(), StoreError> {
        Err(StoreError::StorageError("disk on fire".to_string()))
    }

    async fn get(
        &self,
        _kind: ItemKind,
        _partition_key: &str,
        _sort_key: &str,
    ) -> Result<Option<StoredItem>, StoreError> {
        Ok(None)
    }

    async fn query_partition(
        &self,
        _kind: ItemKind,
        _partition_key: &str,
        _limit: usize,
    ) -> Result<Vec<StoredItem>, StoreError> {
        Ok(Vec::new())
    }
}

/// In-memory store that accepts two items per call and fails its first call.
#[derive(Default)]
pub struct FirstChunkFailsStore {
    inner: InMemoryStore,
    calls: AtomicUsize,
}

#[async_trait]
impl TelemetryStore for FirstChunkFailsStore {
    async fn batch_put(&self, items: &[StoredItem]) -> Result<(), StoreError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(StoreError::StorageError("throttled".to_string()));
        }
        self.inner.batch_put(items).await
    }

    async fn get(
        &self,
        kind: ItemKind,
        partition_key: &str,
        sort_key: &str,
    ) -> Result<Option<StoredItem>, StoreError> {
        self.inner.get(kind, partition_key, sort_key).await
    }

    async fn query_partition(
        &self,
        kind: ItemKind,
        partition_key: &str,
        limit: usize,
    ) -> Result<Vec<StoredItem>, StoreError> {
        self.inner.query_partition(kind, partition_key, limit).await
    }

    fn max_batch_size(&self) -> usize {
        2
    }
}

/// Everything a test needs to inspect after a request.
pub struct TestApp {
    /// The router under test.
    pub router: Router,
    /// The in-memory store behind it.
    pub store: Arc<InMemoryStore>,
    /// The notifier behind it.
    pub notifier: Arc<RecordingNotifier>,
}

fn dispatcher(notifier: Arc<RecordingNotifier>) -> AlertDispatcher {
    AlertDispatcher::new(Arc::new(
        StaticTargets::new().with_target("edge-1", EDGE_1_CHAT),
    ))
    .with_notifier(notifier)
}

/// Creates a test router with a fresh in-memory store and recording notifier.
pub fn test_app() -> TestApp {
    let store = InMemoryStore::new_shared();
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::from_parts(
        &Config::default(),
        store.clone(),
        dispatcher(notifier.clone()),
    );
    TestApp {
        router: create_router(state),
        store,
        notifier,
    }
}

/// Creates a test router whose store rejects every write.
pub fn failing_app() -> (Router, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::from_parts(
        &Config::default(),
        Arc::new(FailingStore),
        dispatcher(notifier.clone()),
    );
    (create_router(state), notifier)
}

/// Creates a test router whose store fails the first chunk of every batch.
pub fn partially_failing_app() -> (Router, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::from_parts(
        &Config::default(),
        Arc::new(FirstChunkFailsStore::default()),
        dispatcher(notifier.clone()),
    );
    (create_router(state), notifier)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}

/// Sends a POST with the default API key plus `headers`.
pub async fn post_raw(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: impl Into<Body>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(API_KEY_HEADER, DEFAULT_API_KEY);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    send(app, builder.body(body.into()).unwrap()).await
}

/// Sends a POST without any credential.
pub async fn post_unauthenticated(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
    body: impl Into<Body>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("POST").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    send(app, builder.body(body.into()).unwrap()).await
}

/// Helper to make a POST request with JSON body.
pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    post_raw(
        app,
        uri,
        &[("content-type", "application/json")],
        serde_json::to_vec(body).unwrap(),
    )
    .await
}

/// Helper to make a GET request.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Plain JSON body with one series per `(name, values)` pair for `cluster`.
pub fn series_body(cluster: &str, series: &[(&str, &[f64])]) -> Value {
    let timeseries: Vec<Value> = series
        .iter()
        .map(|(name, values)| {
            let samples: Vec<Value> = (0_i64..)
                .zip(values.iter())
                .map(|(i, v)| json!({"timestamp_ms": 1_700_000_000_000_i64 + i * 1000, "value": v}))
                .collect();
            json!({
                "labels": {
                    "__name__": name,
                    "cluster_id": cluster,
                    "instance": "node-a",
                    "job": "node"
                },
                "samples": samples
            })
        })
        .collect();
    json!({ "timeseries": timeseries })
}
