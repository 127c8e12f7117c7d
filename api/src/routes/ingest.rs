//! Ingestion endpoints.
//!
//! # Endpoints
//!
//! - `POST /`, `POST /ingest` - auto-detected dialect
//! - `POST /api/v1/write` - Prometheus remote write
//! - `POST /v1/metrics`, `/v1/logs`, `/v1/traces` - OTLP; `Content-Type`
//!   selects protobuf (`application/x-protobuf`) or JSON

use crate::error::IngestError;
use crate::pipeline::IngestSummary;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    routing::post,
    Json, Router,
};
use shared::decode::{Dialect, FormatHint};

/// Content type for protobuf requests.
const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";

/// Creates the ingestion routes with application state.
pub fn ingest_routes(state: AppState) -> Router {
    Router::new()
        .route("/", post(ingest_auto))
        .route("/ingest", post(ingest_auto))
        .route("/api/v1/write", post(ingest_remote_write))
        .route("/v1/metrics", post(ingest_otlp_metrics))
        .route("/v1/logs", post(ingest_otlp_logs))
        .route("/v1/traces", post(ingest_otlp_traces))
        .with_state(state)
}

/// Determines if the request is protobuf based on Content-Type header.
fn is_protobuf(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(CONTENT_TYPE_PROTOBUF))
}

fn otlp_hint(headers: &HeaderMap, protobuf: Dialect, json: Dialect) -> FormatHint {
    FormatHint::Pinned(if is_protobuf(headers) { protobuf } else { json })
}

async fn run(
    state: &AppState,
    headers: &HeaderMap,
    body: &Bytes,
    hint: FormatHint,
) -> Result<Json<IngestSummary>, IngestError> {
    state
        .pipeline()
        .ingest(headers, body, hint)
        .await
        .map(Json)
}

async fn ingest_auto(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestSummary>, IngestError> {
    run(&state, &headers, &body, FormatHint::Auto).await
}

async fn ingest_remote_write(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestSummary>, IngestError> {
    run(&state, &headers, &body, FormatHint::Pinned(Dialect::RemoteWrite)).await
}

async fn ingest_otlp_metrics(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestSummary>, IngestError> {
    let hint = otlp_hint(&headers, Dialect::OtlpMetricsProtobuf, Dialect::OtlpMetricsJson);
    run(&state, &headers, &body, hint).await
}

async fn ingest_otlp_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestSummary>, IngestError> {
    let hint = otlp_hint(&headers, Dialect::OtlpLogsProtobuf, Dialect::OtlpLogsJson);
    run(&state, &headers, &body, hint).await
}

async fn ingest_otlp_traces(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IngestSummary>, IngestError> {
    let hint = otlp_hint(&headers, Dialect::OtlpTracesProtobuf, Dialect::OtlpTracesJson);
    run(&state, &headers, &body, hint).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_otlp_hint_follows_content_type() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            otlp_hint(&headers, Dialect::OtlpLogsProtobuf, Dialect::OtlpLogsJson),
            FormatHint::Pinned(Dialect::OtlpLogsJson)
        );

        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-protobuf; charset=binary"),
        );
        assert_eq!(
            otlp_hint(&headers, Dialect::OtlpLogsProtobuf, Dialect::OtlpLogsJson),
            FormatHint::Pinned(Dialect::OtlpLogsProtobuf)
        );
    }
}
