//! Course catalog endpoints. Reads are open to any authenticated user;
//! writes sit behind `courses:manage`.

use axum::{extract::Path, Extension, Json};
use uuid::Uuid;

use crate::database::models::Course;
use crate::middleware::current_user::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::services::training_service::{NewCourse, UpdateCourse};
use crate::services::TrainingService;

/// GET /api/courses - inactive courses are visible only to course managers
pub async fn list_courses(Extension(user): Extension<CurrentUser>) -> ApiResult<Vec<Course>> {
    let service = TrainingService::new().await?;
    let courses = service.list_courses(user.can("courses:manage")).await?;
    Ok(ApiResponse::success(courses))
}

/// GET /api/courses/:id
pub async fn get_course(
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Course> {
    let service = TrainingService::new().await?;
    let course = service.get_course(id).await?;
    Ok(ApiResponse::success(course))
}

/// POST /api/courses
pub async fn create_course(
    Extension(_user): Extension<CurrentUser>,
    Json(payload): Json<NewCourse>,
) -> ApiResult<Course> {
    let service = TrainingService::new().await?;
    let course = service.create_course(payload).await?;
    Ok(ApiResponse::created(course))
}

/// PUT /api/courses/:id - partial update
pub async fn update_course(
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCourse>,
) -> ApiResult<Course> {
    let service = TrainingService::new().await?;
    let course = service.update_course(id, payload).await?;
    Ok(ApiResponse::success(course))
}

/// DELETE /api/courses/:id - soft delete
pub async fn deactivate_course(
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<()> {
    let service = TrainingService::new().await?;
    service.deactivate_course(id).await?;
    Ok(ApiResponse::<()>::no_content())
}

/// POST /api/courses/:id/restore
pub async fn restore_course(
    Extension(_user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Course> {
    let service = TrainingService::new().await?;
    let course = service.restore_course(id).await?;
    Ok(ApiResponse::success(course))
}
