use axum::{extract::Request, middleware::Next, response::Response};
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::auth::lockout::LockoutPolicy;
use crate::database::DatabaseManager;
use crate::error::ApiError;

/// Fresh user state loaded from the database for every protected request
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub is_verified: bool,
}

impl CurrentUser {
    pub fn can(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// Middleware that validates the user from JWT claims against the users table.
/// Rejects deactivated and locked accounts, and tokens whose role claim no
/// longer matches the database, so demotions take effect before token expiry.
pub async fn current_user_middleware(
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?
        .clone();

    let pool = DatabaseManager::pool().await?;

    let row = sqlx::query(
        r#"
        SELECT u.id, u.username, u.email, r.name AS role,
               u.is_active, u.is_verified, u.deactivated_at, u.locked_until
        FROM users u
        JOIN roles r ON r.id = u.role_id
        WHERE u.id = $1
        "#,
    )
    .bind(auth_user.user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error validating user '{}': {}", auth_user.username, e);
        ApiError::internal_server_error("Failed to validate user")
    })?;

    let user_row = row.ok_or_else(|| {
        tracing::warn!(
            "User validation failed: user '{}' (ID: {}) no longer exists",
            auth_user.username,
            auth_user.user_id
        );
        ApiError::forbidden("User account no longer exists")
    })?;

    let is_active: bool = user_row.get("is_active");
    let deactivated_at: Option<chrono::DateTime<Utc>> = user_row.get("deactivated_at");
    if !is_active || deactivated_at.is_some() {
        tracing::warn!("User validation failed: '{}' is deactivated", auth_user.username);
        return Err(ApiError::forbidden("Account is deactivated"));
    }

    let locked_until = user_row.get("locked_until");
    if LockoutPolicy::is_locked(locked_until, Utc::now()) {
        tracing::warn!("User validation failed: '{}' is locked", auth_user.username);
        return Err(ApiError::AccountLocked("Account is locked".to_string()));
    }

    // A stale token must not grant a role the user no longer holds
    let db_role: String = user_row.get("role");
    if db_role != auth_user.role {
        tracing::warn!(
            "User validation failed: JWT role '{}' doesn't match database role '{}' for '{}'",
            auth_user.role,
            db_role,
            auth_user.username
        );
        return Err(ApiError::forbidden("User role has changed; please log in again"));
    }

    let permissions: Vec<String> = sqlx::query(
        r#"
        SELECT p.name
        FROM permissions p
        JOIN role_permissions rp ON rp.permission_id = p.id
        JOIN users u ON u.role_id = rp.role_id
        WHERE u.id = $1
        ORDER BY p.name
        "#,
    )
    .bind(auth_user.user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Database error loading permissions for '{}': {}", auth_user.username, e);
        ApiError::internal_server_error("Failed to validate user")
    })?
    .iter()
    .map(|row| row.get("name"))
    .collect();

    let current_user = CurrentUser {
        id: user_row.get("id"),
        username: user_row.get("username"),
        email: user_row.get("email"),
        role: db_role,
        permissions,
        is_verified: user_row.get("is_verified"),
    };

    tracing::debug!(
        "User validation successful: {} ({}) with {} permissions",
        current_user.username,
        current_user.role,
        current_user.permissions.len()
    );

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(permissions: &[&str]) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            role: "manager".to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            is_verified: true,
        }
    }

    #[test]
    fn can_checks_exact_permission_names() {
        let user = user_with(&["profile:read", "training:manage"]);
        assert!(user.can("training:manage"));
        assert!(!user.can("users:manage"));
        assert!(!user.can("training"));
    }
}
