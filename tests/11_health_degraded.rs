//! Degraded health reporting. This test clears DATABASE_URL, a process-wide
//! mutation, so it lives alone in its own test binary where no sibling test
//! can observe the change.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

#[tokio::test]
async fn health_reports_degraded_without_a_database() {
    std::env::remove_var("DATABASE_URL");
    let app = aep_api::server::app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["status"], "degraded");
}
