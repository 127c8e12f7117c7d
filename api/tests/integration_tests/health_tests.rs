//! Integration tests for the health endpoint.

use axum::http::StatusCode;

use super::common::{get, test_app};

#[tokio::test]
async fn test_health_check() {
    let app = test_app();

    let (status, response) = get(app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["service"], "edgewatch-api");
    assert_eq!(response["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_health_needs_no_key_and_writes_nothing() {
    let app = test_app();

    let (status, _) = get(app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.batch_put_calls(), 0);
}
