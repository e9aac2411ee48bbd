//! Public authentication endpoints: register, login, refresh, verify.
//!
//! Input shape validation happens here, before any service (and therefore any
//! database connection) is touched, so malformed requests fail fast with 400s.

use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::is_development;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::auth_service::{
    validate_email, validate_username, AuthService, NewAccount, Session,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email, matched case-insensitively
    pub identity: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

/// POST /auth/register - create an account with the default employee role
pub async fn register(Json(payload): Json<RegisterRequest>) -> ApiResult<Value> {
    let mut field_errors = HashMap::new();
    if let Err(msg) = validate_username(&payload.username) {
        field_errors.insert("username".to_string(), msg);
    }
    if let Err(msg) = validate_email(&payload.email) {
        field_errors.insert("email".to_string(), msg);
    }
    if let Err(msg) = crate::auth::password::check_policy(&payload.password) {
        field_errors.insert("password".to_string(), msg);
    }
    if !field_errors.is_empty() {
        return Err(ApiError::validation_error("Invalid registration", Some(field_errors)));
    }

    let service = AuthService::new().await?;
    let registered = service
        .register(NewAccount {
            username: payload.username,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    // No mail transport: the raw verification token is logged server-side and
    // only echoed to the client in the development profile.
    let mut body = json!({ "user": registered.user });
    if is_development!() {
        body["verification_token"] = json!(registered.verification_token);
    }

    Ok(ApiResponse::created(body))
}

/// POST /auth/login - authenticate and open a session
pub async fn login(Json(payload): Json<LoginRequest>) -> ApiResult<Session> {
    if payload.identity.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation_error(
            "Identity and password are required",
            None,
        ));
    }

    let service = AuthService::new().await?;
    let session = service.login(payload.identity.trim(), &payload.password).await?;
    Ok(ApiResponse::success(session))
}

/// POST /auth/refresh - rotate a refresh token into a new session
pub async fn refresh(Json(payload): Json<RefreshRequest>) -> ApiResult<Session> {
    if payload.refresh_token.is_empty() {
        return Err(ApiError::validation_error("refresh_token is required", None));
    }

    let service = AuthService::new().await?;
    let session = service.refresh(&payload.refresh_token).await?;
    Ok(ApiResponse::success(session))
}

/// POST /auth/verify - redeem an email verification token
pub async fn verify(Json(payload): Json<VerifyRequest>) -> ApiResult<Value> {
    if payload.token.is_empty() {
        return Err(ApiError::validation_error("token is required", None));
    }

    let service = AuthService::new().await?;
    service.verify_email(&payload.token).await?;
    Ok(ApiResponse::success(json!({ "verified": true })))
}
