use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Full user row, always fetched with the role name joined in.
/// Never serialized outward: the password hash stays server-side.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role_id: Uuid,
    pub role: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub failed_login_count: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_deactivated(&self) -> bool {
        !self.is_active || self.deactivated_at.is_some()
    }
}

/// Client-safe projection of a user record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            is_active: user.is_active && user.deactivated_at.is_none(),
            is_verified: user.is_verified,
            locked_until: user.locked_until,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// Columns behind `UserSummary`, for queries that skip the full row
pub const USER_SUMMARY_COLUMNS: &str = r#"
    u.id, u.username, u.email, r.name AS role,
    (u.is_active AND u.deactivated_at IS NULL) AS is_active,
    u.is_verified, u.locked_until, u.last_login_at, u.created_at
"#;

/// Columns for the full `User` row including the joined role name
pub const USER_COLUMNS: &str = r#"
    u.id, u.username, u.email, u.password_hash, u.role_id, r.name AS role,
    u.is_active, u.is_verified, u.failed_login_count, u.locked_until,
    u.last_login_at, u.deactivated_at, u.created_at, u.updated_at
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            role_id: Uuid::new_v4(),
            role: "employee".to_string(),
            is_active: true,
            is_verified: false,
            failed_login_count: 0,
            locked_until: None,
            last_login_at: None,
            deactivated_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn summary_never_carries_password_hash() {
        let summary = UserSummary::from(&sample_user());
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "employee");
    }

    #[test]
    fn deactivated_at_overrides_active_flag() {
        let mut user = sample_user();
        user.deactivated_at = Some(Utc::now());
        assert!(user.is_deactivated());
        let summary = UserSummary::from(&user);
        assert!(!summary.is_active);
    }
}
