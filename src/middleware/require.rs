use axum::{extract::Request, middleware::Next, response::Response};

use super::current_user::CurrentUser;
use crate::error::ApiError;

/// Permission gate for a route group. Wire it up with
/// `middleware::from_fn(|req, next| require("training:manage", req, next))`
/// behind the jwt + current-user layers.
pub async fn require(
    permission: &'static str,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !user.can(permission) {
        tracing::warn!(
            "Permission denied: '{}' lacks '{}' (role {})",
            user.username,
            permission,
            user.role
        );
        return Err(ApiError::forbidden(format!(
            "Missing required permission: {}",
            permission
        )));
    }

    Ok(next.run(request).await)
}
