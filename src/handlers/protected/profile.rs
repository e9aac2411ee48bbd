//! Profile and dashboard endpoints.

use axum::{Extension, Json};

use crate::middleware::current_user::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::user_service::{Dashboard, Profile, UpdateProfile};
use crate::services::UserService;

/// GET /api/profile
pub async fn get_profile(Extension(user): Extension<CurrentUser>) -> ApiResult<Profile> {
    let service = UserService::new().await?;
    let profile = service.get_profile(user.id).await?;
    Ok(ApiResponse::success(profile))
}

/// PUT /api/profile - email changes reset verification
pub async fn update_profile(
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<UpdateProfile>,
) -> ApiResult<Profile> {
    let service = UserService::new().await?;
    let profile = service.update_profile(user.id, payload).await?;
    Ok(ApiResponse::success(profile))
}

/// GET /api/profile/dashboard - the aggregate the dashboard UI renders
pub async fn dashboard(Extension(user): Extension<CurrentUser>) -> ApiResult<Dashboard> {
    let service = UserService::new().await?;
    let dashboard = service.dashboard(user.id).await?;
    Ok(ApiResponse::success(dashboard))
}
