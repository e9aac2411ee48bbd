//! Profile, dashboard aggregate, and admin user management.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::role::is_known_role;
use crate::database::models::training_need::NeedStatus;
use crate::database::models::user::{User, UserSummary, USER_COLUMNS, USER_SUMMARY_COLUMNS};
use crate::services::auth_service::{self, validate_email};

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Duplicate email")]
    DuplicateEmail,

    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("{0}")]
    SelfAction(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for UserError {
    fn from(err: sqlx::Error) -> Self {
        UserError::Database(DatabaseError::Sqlx(err))
    }
}

#[derive(Debug, Serialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: UserSummary,
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfile {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NeedCounts {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub completed: i64,
}

#[derive(Debug, Serialize)]
pub struct AssignedCourse {
    pub need_id: Uuid,
    pub course_id: Uuid,
    pub code: String,
    pub title: String,
    pub status: NeedStatus,
}

/// The JSON the profile dashboard renders
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub user: UserSummary,
    pub training_needs: NeedCounts,
    pub assigned_courses: Vec<AssignedCourse>,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    /// Clamp to configured page-size limits; pages are 1-based
    pub fn limit_offset(&self) -> (i64, i64) {
        let api = &config::config().api;
        let per_page = self
            .per_page
            .unwrap_or(api.default_page_size)
            .clamp(1, api.max_page_size);
        let page = self.page.unwrap_or(1).max(1);
        (per_page as i64, ((page - 1) as i64) * per_page as i64)
    }
}

pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub async fn new() -> Result<Self, UserError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<Profile, UserError> {
        let user = self.fetch_user(user_id).await?;
        let permissions = self.permissions_for(user_id).await?;
        Ok(Profile {
            user: UserSummary::from(&user),
            permissions,
        })
    }

    /// Change the profile email. The new address is unverified until the
    /// fresh verification token is redeemed.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfile,
    ) -> Result<Profile, UserError> {
        if let Some(email) = update.email {
            validate_email(&email).map_err(UserError::Validation)?;

            // Email swap and the replacement verification token land together
            let mut tx = self.pool.begin().await?;
            sqlx::query(
                r#"
                UPDATE users
                SET email = $2, is_verified = false, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .bind(&email)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    UserError::DuplicateEmail
                } else {
                    UserError::from(e)
                }
            })?;

            let token = auth_service::issue_verification_token(&mut *tx, user_id)
                .await
                .map_err(|e| UserError::Database(DatabaseError::QueryError(e.to_string())))?;
            tx.commit().await?;

            info!(%user_id, "Email changed; new verification token: {}", token);
        }

        self.get_profile(user_id).await
    }

    pub async fn dashboard(&self, user_id: Uuid) -> Result<Dashboard, UserError> {
        let user = self.fetch_user(user_id).await?;

        let counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM training_needs WHERE user_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut needs = NeedCounts {
            pending: 0,
            approved: 0,
            rejected: 0,
            completed: 0,
        };
        for (status, count) in counts {
            match status.as_str() {
                "pending" => needs.pending = count,
                "approved" => needs.approved = count,
                "rejected" => needs.rejected = count,
                "completed" => needs.completed = count,
                _ => {}
            }
        }

        let assigned_courses: Vec<AssignedCourse> = sqlx::query_as::<
            _,
            (Uuid, Uuid, String, String, NeedStatus),
        >(
            r#"
            SELECT n.id, c.id, c.code, c.title, n.status
            FROM training_needs n
            JOIN courses c ON c.id = n.course_id
            WHERE n.user_id = $1 AND n.status IN ('approved', 'completed') AND c.is_active
            ORDER BY n.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(need_id, course_id, code, title, status)| AssignedCourse {
            need_id,
            course_id,
            code,
            title,
            status,
        })
        .collect();

        Ok(Dashboard {
            user: UserSummary::from(&user),
            training_needs: needs,
            assigned_courses,
        })
    }

    // Admin operations (routes gated on users:manage)

    pub async fn list_users(&self, page: &PageParams) -> Result<(Vec<UserSummary>, i64), UserError> {
        let (limit, offset) = page.limit_offset();

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            r#"
            SELECT {USER_SUMMARY_COLUMNS}
            FROM users u JOIN roles r ON r.id = u.role_id
            ORDER BY u.created_at DESC
            LIMIT $1 OFFSET $2
            "#
        );
        let users = sqlx::query_as::<_, UserSummary>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((users, total.0))
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserSummary, UserError> {
        let user = self.fetch_user(user_id).await?;
        Ok(UserSummary::from(&user))
    }

    /// Assign a different role. Admins cannot change their own role so the
    /// deployment always keeps at least its acting administrator.
    pub async fn set_role(
        &self,
        acting_admin: Uuid,
        user_id: Uuid,
        role_name: &str,
    ) -> Result<UserSummary, UserError> {
        if !is_known_role(role_name) {
            return Err(UserError::UnknownRole(role_name.to_string()));
        }
        if acting_admin == user_id {
            return Err(UserError::SelfAction(
                "Administrators cannot change their own role".to_string(),
            ));
        }

        let updated = sqlx::query(
            r#"
            UPDATE users
            SET role_id = (SELECT id FROM roles WHERE name = $2), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(role_name)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }

        info!(%user_id, role = role_name, "Role changed");
        self.get_user(user_id).await
    }

    /// Clear the lockout state so the user can log in again immediately
    pub async fn unlock(&self, user_id: Uuid) -> Result<UserSummary, UserError> {
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET failed_login_count = 0, locked_until = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }

        info!(%user_id, "Account unlocked");
        self.get_user(user_id).await
    }

    /// Soft-deactivate: the row stays, refresh tokens are revoked, and the
    /// request-gating middleware rejects the account from now on.
    pub async fn deactivate(&self, acting_admin: Uuid, user_id: Uuid) -> Result<(), UserError> {
        if acting_admin == user_id {
            return Err(UserError::SelfAction(
                "Administrators cannot deactivate themselves".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET deactivated_at = now(), is_active = false, updated_at = now()
            WHERE id = $1 AND deactivated_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(UserError::NotFound);
        }

        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(%user_id, "Account deactivated");
        Ok(())
    }

    pub async fn restore(&self, user_id: Uuid) -> Result<UserSummary, UserError> {
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET deactivated_at = NULL, is_active = true, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(UserError::NotFound);
        }

        info!(%user_id, "Account restored");
        self.get_user(user_id).await
    }

    async fn fetch_user(&self, user_id: Uuid) -> Result<User, UserError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(UserError::NotFound)
    }

    async fn permissions_for(&self, user_id: Uuid) -> Result<Vec<String>, UserError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT p.name
            FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN users u ON u.role_id = rp.role_id
            WHERE u.id = $1
            ORDER BY p.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_clamp_to_config() {
        let max = config::config().api.max_page_size;
        let default = config::config().api.default_page_size;

        let (limit, offset) = PageParams { page: None, per_page: None }.limit_offset();
        assert_eq!(limit, default as i64);
        assert_eq!(offset, 0);

        let (limit, _) = PageParams { page: Some(1), per_page: Some(max * 10) }.limit_offset();
        assert_eq!(limit, max as i64);

        let (limit, offset) = PageParams { page: Some(3), per_page: Some(10) }.limit_offset();
        assert_eq!(limit, 10);
        assert_eq!(offset, 20);

        // Page 0 is treated as page 1
        let (_, offset) = PageParams { page: Some(0), per_page: Some(10) }.limit_offset();
        assert_eq!(offset, 0);
    }
}
