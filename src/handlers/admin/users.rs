//! Admin user management, route-layered with `users:manage`.

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::UserSummary;
use crate::middleware::current_user::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::user_service::PageParams;
use crate::services::UserService;

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// GET /api/admin/users - newest first, paginated
pub async fn list_users(
    Extension(_user): Extension<CurrentUser>,
    Query(page): Query<PageParams>,
) -> ApiResult<Value> {
    let service = UserService::new().await?;
    let (users, total) = service.list_users(&page).await?;
    Ok(ApiResponse::success(json!({
        "users": users,
        "total": total,
    })))
}

/// GET /api/admin/users/:id
pub async fn get_user(
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<UserSummary> {
    let service = UserService::new().await?;
    let user = service.get_user(id).await?;
    Ok(ApiResponse::success(user))
}

/// PUT /api/admin/users/:id/role
pub async fn set_role(
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> ApiResult<UserSummary> {
    let service = UserService::new().await?;
    let user = service.set_role(admin.id, id, &payload.role).await?;
    Ok(ApiResponse::success(user))
}

/// POST /api/admin/users/:id/unlock - clear lockout state
pub async fn unlock(
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<UserSummary> {
    let service = UserService::new().await?;
    let user = service.unlock(id).await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /api/admin/users/:id - soft deactivation
pub async fn deactivate(
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let service = UserService::new().await?;
    service.deactivate(admin.id, id).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// POST /api/admin/users/:id/restore
pub async fn restore(
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<UserSummary> {
    let service = UserService::new().await?;
    let user = service.restore(id).await?;
    Ok(ApiResponse::success(user))
}
