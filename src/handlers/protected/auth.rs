//! Session endpoints for authenticated users.

use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::current_user::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::AuthService;

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// GET /api/auth/whoami - current user with permission set
pub async fn whoami(Extension(user): Extension<CurrentUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "role": user.role,
        "permissions": user.permissions,
        "is_verified": user.is_verified,
    })))
}

/// DELETE /api/auth/session - revoke the presented refresh token
pub async fn logout(
    Extension(_user): Extension<CurrentUser>,
    Json(payload): Json<LogoutRequest>,
) -> ApiResult<()> {
    let service = AuthService::new().await?;
    service.logout(&payload.refresh_token).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// PUT /api/auth/password - change password, revoking all refresh tokens
pub async fn change_password(
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    if let Err(msg) = crate::auth::password::check_policy(&payload.new_password) {
        return Err(ApiError::validation_error(msg, None));
    }

    let service = AuthService::new().await?;
    service
        .change_password(user.id, &payload.current_password, &payload.new_password)
        .await?;
    Ok(ApiResponse::<()>::no_content())
}
