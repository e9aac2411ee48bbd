//! Training-need endpoints: employee self-service plus the manager review
//! surface (the routes behind `training:manage`).

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::TrainingNeed;
use crate::middleware::current_user::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::training_service::{NeedDecision, NeedFilters, NewTrainingNeed};
use crate::services::TrainingService;

/// GET /api/training/needs - own needs, newest first
pub async fn list_needs(Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<TrainingNeed>> {
    let service = TrainingService::new().await?;
    let needs = service.list_needs(user.id).await?;
    Ok(ApiResponse::success(needs))
}

/// POST /api/training/needs
pub async fn create_need(
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<NewTrainingNeed>,
) -> ApiResult<TrainingNeed> {
    let service = TrainingService::new().await?;
    let need = service.create_need(user.id, payload).await?;
    Ok(ApiResponse::created(need))
}

/// GET /api/training/needs/:id - owner or training:manage
pub async fn get_need(
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<TrainingNeed> {
    let service = TrainingService::new().await?;
    let need = service
        .get_need(id, user.id, user.can("training:manage"))
        .await?;
    Ok(ApiResponse::success(need))
}

/// DELETE /api/training/needs/:id - own pending needs, or any with training:manage
pub async fn delete_need(
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let service = TrainingService::new().await?;
    service
        .delete_need(id, user.id, user.can("training:manage"))
        .await?;
    Ok(ApiResponse::<()>::no_content())
}

// Manager surface (route-layered with training:manage)

/// GET /api/training/all - every user's needs with status/user/paging filters
pub async fn list_all_needs(
    Extension(_user): Extension<CurrentUser>,
    Query(filters): Query<NeedFilters>,
) -> ApiResult<Value> {
    let service = TrainingService::new().await?;
    let (needs, total) = service.list_all_needs(&filters).await?;
    Ok(ApiResponse::success(json!({
        "needs": needs,
        "total": total,
    })))
}

/// POST /api/training/needs/:id/decision - approve or reject a pending need
pub async fn decide_need(
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NeedDecision>,
) -> ApiResult<TrainingNeed> {
    let service = TrainingService::new().await?;
    let need = service.decide_need(id, payload, user.id).await?;
    Ok(ApiResponse::success(need))
}

/// POST /api/training/needs/:id/complete - approved needs only
pub async fn complete_need(
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<TrainingNeed> {
    let service = TrainingService::new().await?;
    let need = service.complete_need(id).await?;
    Ok(ApiResponse::success(need))
}
