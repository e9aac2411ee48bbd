//! Training needs and the course catalog.

use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::course::{Course, CourseDelivery};
use crate::database::models::training_need::{NeedPriority, NeedStatus, TrainingNeed};
use crate::services::user_service::PageParams;

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Duplicate course code: {0}")]
    DuplicateCode(String),

    #[error("Referenced course does not exist")]
    UnknownCourse,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for TrainingError {
    fn from(err: sqlx::Error) -> Self {
        TrainingError::Database(DatabaseError::Sqlx(err))
    }
}

#[derive(Debug, Deserialize)]
pub struct NewTrainingNeed {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Option<NeedPriority>,
    pub course_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct NeedDecision {
    pub approve: bool,
    /// Optional course assignment, applied only on approval
    pub course_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NeedFilters {
    pub status: Option<NeedStatus>,
    pub user_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl NeedFilters {
    fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewCourse {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub delivery: Option<CourseDelivery>,
    pub duration_hours: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCourse {
    pub title: Option<String>,
    pub description: Option<String>,
    pub delivery: Option<CourseDelivery>,
    pub duration_hours: Option<i32>,
}

const NEED_COLUMNS: &str = r#"
    id, user_id, course_id, title, description, priority, status,
    decided_by, decided_at, created_at, updated_at
"#;

pub struct TrainingService {
    pool: PgPool,
}

impl TrainingService {
    pub async fn new() -> Result<Self, TrainingError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    // Training needs

    pub async fn create_need(
        &self,
        owner: Uuid,
        need: NewTrainingNeed,
    ) -> Result<TrainingNeed, TrainingError> {
        let title = need.title.trim();
        if title.is_empty() {
            return Err(TrainingError::Validation("Title is required".to_string()));
        }
        if title.len() > 200 {
            return Err(TrainingError::Validation(
                "Title must be less than 200 characters".to_string(),
            ));
        }

        if let Some(course_id) = need.course_id {
            self.require_course(course_id).await?;
        }

        let priority = need.priority.unwrap_or(NeedPriority::Medium);
        let sql = format!(
            r#"
            INSERT INTO training_needs (user_id, course_id, title, description, priority)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {NEED_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, TrainingNeed>(&sql)
            .bind(owner)
            .bind(need.course_id)
            .bind(title)
            .bind(need.description.trim())
            .bind(priority)
            .fetch_one(&self.pool)
            .await?;

        info!(need_id = %created.id, %owner, "Training need created");
        Ok(created)
    }

    pub async fn list_needs(&self, owner: Uuid) -> Result<Vec<TrainingNeed>, TrainingError> {
        let sql = format!(
            "SELECT {NEED_COLUMNS} FROM training_needs WHERE user_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, TrainingNeed>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Manager view across all users, with optional status/user filters
    pub async fn list_all_needs(
        &self,
        filters: &NeedFilters,
    ) -> Result<(Vec<TrainingNeed>, i64), TrainingError> {
        let (limit, offset) = filters.page_params().limit_offset();

        let total: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM training_needs
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
            "#,
        )
        .bind(filters.status.map(|s| s.as_str()))
        .bind(filters.user_id)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {NEED_COLUMNS} FROM training_needs
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR user_id = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        );
        let needs = sqlx::query_as::<_, TrainingNeed>(&sql)
            .bind(filters.status.map(|s| s.as_str()))
            .bind(filters.user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((needs, total.0))
    }

    /// Fetch a need, visible to its owner or anyone with `training:manage`
    pub async fn get_need(
        &self,
        need_id: Uuid,
        requester: Uuid,
        can_manage: bool,
    ) -> Result<TrainingNeed, TrainingError> {
        let need = self.fetch_need(need_id).await?;
        if !can_manage && need.user_id != requester {
            // Hide existence from other users
            return Err(TrainingError::NotFound("Training need"));
        }
        Ok(need)
    }

    /// Approve or reject a pending need, optionally assigning a course
    pub async fn decide_need(
        &self,
        need_id: Uuid,
        decision: NeedDecision,
        decider: Uuid,
    ) -> Result<TrainingNeed, TrainingError> {
        let need = self.fetch_need(need_id).await?;
        if need.status != NeedStatus::Pending {
            return Err(TrainingError::InvalidState(format!(
                "Only pending needs can be decided; this one is {}",
                need.status.as_str()
            )));
        }

        let status = if decision.approve {
            NeedStatus::Approved
        } else {
            NeedStatus::Rejected
        };

        let course_id = if decision.approve {
            if let Some(course_id) = decision.course_id {
                self.require_course(course_id).await?;
                Some(course_id)
            } else {
                need.course_id
            }
        } else {
            need.course_id
        };

        let sql = format!(
            r#"
            UPDATE training_needs
            SET status = $2, course_id = $3, decided_by = $4, decided_at = $5, updated_at = now()
            WHERE id = $1 AND status = 'pending'
            RETURNING {NEED_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, TrainingNeed>(&sql)
            .bind(need_id)
            .bind(status)
            .bind(course_id)
            .bind(decider)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            // Lost a race with a concurrent decision
            .ok_or_else(|| {
                TrainingError::InvalidState("Need was already decided".to_string())
            })?;

        info!(%need_id, status = status.as_str(), %decider, "Training need decided");
        Ok(updated)
    }

    /// Move an approved need to completed
    pub async fn complete_need(&self, need_id: Uuid) -> Result<TrainingNeed, TrainingError> {
        let need = self.fetch_need(need_id).await?;
        if need.status != NeedStatus::Approved {
            return Err(TrainingError::InvalidState(format!(
                "Only approved needs can be completed; this one is {}",
                need.status.as_str()
            )));
        }

        let sql = format!(
            r#"
            UPDATE training_needs
            SET status = 'completed', updated_at = now()
            WHERE id = $1 AND status = 'approved'
            RETURNING {NEED_COLUMNS}
            "#
        );
        sqlx::query_as::<_, TrainingNeed>(&sql)
            .bind(need_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| TrainingError::InvalidState("Need is no longer approved".to_string()))
    }

    /// Owners may delete their own pending needs; managers may delete any
    pub async fn delete_need(
        &self,
        need_id: Uuid,
        requester: Uuid,
        can_manage: bool,
    ) -> Result<(), TrainingError> {
        let need = self.fetch_need(need_id).await?;

        if !can_manage {
            if need.user_id != requester {
                return Err(TrainingError::NotFound("Training need"));
            }
            if need.status != NeedStatus::Pending {
                return Err(TrainingError::InvalidState(
                    "Only pending needs can be deleted".to_string(),
                ));
            }
        }

        sqlx::query("DELETE FROM training_needs WHERE id = $1")
            .bind(need_id)
            .execute(&self.pool)
            .await?;

        info!(%need_id, "Training need deleted");
        Ok(())
    }

    // Courses

    pub async fn list_courses(&self, include_inactive: bool) -> Result<Vec<Course>, TrainingError> {
        let courses = sqlx::query_as::<_, Course>(
            r#"
            SELECT * FROM courses
            WHERE is_active OR $1
            ORDER BY code
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(courses)
    }

    pub async fn get_course(&self, course_id: Uuid) -> Result<Course, TrainingError> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(TrainingError::NotFound("Course"))
    }

    pub async fn create_course(&self, course: NewCourse) -> Result<Course, TrainingError> {
        let code = course.code.trim();
        if code.is_empty() {
            return Err(TrainingError::Validation("Course code is required".to_string()));
        }
        if course.title.trim().is_empty() {
            return Err(TrainingError::Validation("Course title is required".to_string()));
        }
        if course.duration_hours.is_some_and(|h| h < 0) {
            return Err(TrainingError::Validation(
                "Duration cannot be negative".to_string(),
            ));
        }

        let created = sqlx::query_as::<_, Course>(
            r#"
            INSERT INTO courses (code, title, description, delivery, duration_hours)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(course.title.trim())
        .bind(course.description.trim())
        .bind(course.delivery.unwrap_or(CourseDelivery::SelfPaced))
        .bind(course.duration_hours.unwrap_or(0))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                TrainingError::DuplicateCode(code.to_string())
            } else {
                TrainingError::from(e)
            }
        })?;

        info!(course = %created.code, "Course created");
        Ok(created)
    }

    pub async fn update_course(
        &self,
        course_id: Uuid,
        update: UpdateCourse,
    ) -> Result<Course, TrainingError> {
        if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(TrainingError::Validation("Course title cannot be empty".to_string()));
        }
        if update.duration_hours.is_some_and(|h| h < 0) {
            return Err(TrainingError::Validation(
                "Duration cannot be negative".to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Course>(
            r#"
            UPDATE courses
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                delivery = COALESCE($4, delivery),
                duration_hours = COALESCE($5, duration_hours),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(course_id)
        .bind(update.title.map(|t| t.trim().to_string()))
        .bind(update.description)
        .bind(update.delivery)
        .bind(update.duration_hours)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(TrainingError::NotFound("Course"))?;

        Ok(updated)
    }

    /// Soft delete: the course disappears from the default catalog but
    /// existing need references stay intact
    pub async fn deactivate_course(&self, course_id: Uuid) -> Result<(), TrainingError> {
        let updated =
            sqlx::query("UPDATE courses SET is_active = false, updated_at = now() WHERE id = $1")
                .bind(course_id)
                .execute(&self.pool)
                .await?;

        if updated.rows_affected() == 0 {
            return Err(TrainingError::NotFound("Course"));
        }
        info!(%course_id, "Course deactivated");
        Ok(())
    }

    pub async fn restore_course(&self, course_id: Uuid) -> Result<Course, TrainingError> {
        sqlx::query_as::<_, Course>(
            "UPDATE courses SET is_active = true, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(TrainingError::NotFound("Course"))
    }

    async fn fetch_need(&self, need_id: Uuid) -> Result<TrainingNeed, TrainingError> {
        let sql = format!("SELECT {NEED_COLUMNS} FROM training_needs WHERE id = $1");
        sqlx::query_as::<_, TrainingNeed>(&sql)
            .bind(need_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(TrainingError::NotFound("Training need"))
    }

    async fn require_course(&self, course_id: Uuid) -> Result<Course, TrainingError> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(TrainingError::UnknownCourse)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}
