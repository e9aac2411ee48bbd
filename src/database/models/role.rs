use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

/// The seeded role names. Anything else in a role-change request is a 400.
pub const ROLE_NAMES: &[&str] = &["employee", "manager", "admin"];

pub fn is_known_role(name: &str) -> bool {
    ROLE_NAMES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_roles() {
        assert!(is_known_role("employee"));
        assert!(is_known_role("admin"));
        assert!(!is_known_role("superuser"));
        assert!(!is_known_role("Employee"));
    }
}
