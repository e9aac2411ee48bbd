//! A well-signed token must get past the 401 layer and fail in the
//! database-backed current-user lookup instead. This test clears
//! DATABASE_URL, a process-wide mutation, so it lives alone in its own test
//! binary where no sibling test can observe the change.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;
use uuid::Uuid;

use aep_api::auth::{generate_jwt, Claims};

#[tokio::test]
async fn valid_token_passes_jwt_layer_and_reaches_user_validation() {
    std::env::remove_var("DATABASE_URL");
    let app = aep_api::server::app();

    let claims = Claims::new(Uuid::new_v4(), "jdoe".to_string(), "employee".to_string());
    let token = generate_jwt(&claims).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/whoami")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
