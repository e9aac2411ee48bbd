//! JWT gating on the protected surface. No database: every request here must
//! be decided by the auth layers before any query could run.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use aep_api::auth::{generate_jwt, Claims, JWT_ISSUER};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn missing_token_is_401_with_error_envelope() {
    let app = aep_api::server::app();

    let response = app.oneshot(get("/api/auth/whoami", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], true);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn garbage_token_is_401() {
    let app = aep_api::server::app();

    let response = app
        .oneshot(get("/api/profile", Some("not.a.jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_bearer_scheme_is_401() {
    let app = aep_api::server::app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/whoami")
                .header("authorization", "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_401() {
    let app = aep_api::server::app();

    let now = Utc::now();
    let claims = Claims {
        sub: Uuid::new_v4(),
        username: "ghost".to_string(),
        role: "employee".to_string(),
        iss: JWT_ISSUER.to_string(),
        exp: (now - Duration::hours(2)).timestamp(),
        iat: (now - Duration::hours(3)).timestamp(),
    };
    let token = generate_jwt(&claims).expect("dev profile has a signing secret");

    let response = app
        .oneshot(get("/api/auth/whoami", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_and_manager_routes_are_gated_too() {
    let app = aep_api::server::app();

    for uri in ["/api/admin/users", "/api/training/all", "/api/courses"] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} must be gated", uri);
    }
}
