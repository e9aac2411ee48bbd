//! Public-endpoint validation: these 400s must fire before any database
//! access, so the whole file runs without Postgres.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn register_rejects_bad_fields_with_field_errors() {
    let app = aep_api::server::app();

    let response = app
        .oneshot(post_json(
            "/auth/register",
            json!({
                "username": "x",
                "email": "not-an-email",
                "password": "short"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["field_errors"]["username"].is_string());
    assert!(body["field_errors"]["email"].is_string());
    assert!(body["field_errors"]["password"].is_string());
}

#[tokio::test]
async fn register_rejects_leading_punctuation_username() {
    let app = aep_api::server::app();

    let response = app
        .oneshot(post_json(
            "/auth/register",
            json!({
                "username": "-jdoe",
                "email": "jdoe@example.com",
                "password": "a perfectly fine password"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["field_errors"]["username"].is_string());
    assert!(body["field_errors"].get("email").is_none());
}

#[tokio::test]
async fn login_requires_identity_and_password() {
    let app = aep_api::server::app();

    let response = app
        .oneshot(post_json(
            "/auth/login",
            json!({ "identity": "  ", "password": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn refresh_requires_a_token() {
    let app = aep_api::server::app();

    let response = app
        .oneshot(post_json("/auth/refresh", json!({ "refresh_token": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_json_is_a_client_error() {
    let app = aep_api::server::app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn verify_requires_a_token() {
    let app = aep_api::server::app();

    let response = app
        .oneshot(post_json("/auth/verify", json!({ "token": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
