//! Registration, login, token lifecycle, and the lockout state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::lockout::{LockoutDecision, LockoutPolicy};
use crate::auth::password::{self, PasswordError};
use crate::auth::tokens;
use crate::auth::{generate_jwt, Claims, JwtError};
use crate::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::token::RefreshToken;
use crate::database::models::user::{User, UserSummary, USER_COLUMNS};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked until {until}")]
    AccountLocked { until: DateTime<Utc> },

    #[error("Account is deactivated")]
    AccountDisabled,

    #[error("Duplicate {0}")]
    DuplicateUser(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("{0}")]
    Validation(String),

    #[error("Password hashing error: {0}")]
    Hash(#[from] PasswordError),

    #[error("Token error: {0}")]
    Jwt(#[from] JwtError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(DatabaseError::Sqlx(err))
    }
}

#[derive(Debug, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredAccount {
    pub user: UserSummary,
    /// Raw email-verification token. There is no mail transport; the HTTP
    /// layer only echoes this in the development profile, ops use the CLI.
    #[serde(skip_serializing)]
    pub verification_token: String,
}

#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: UserSummary,
}

pub struct AuthService {
    pool: PgPool,
}

impl AuthService {
    pub async fn new() -> Result<Self, AuthError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// Create a new account with the default `employee` role
    pub async fn register(&self, account: NewAccount) -> Result<RegisteredAccount, AuthError> {
        validate_username(&account.username).map_err(AuthError::Validation)?;
        validate_email(&account.email).map_err(AuthError::Validation)?;
        password::check_policy(&account.password).map_err(AuthError::Validation)?;

        let password_hash = password::hash_password(&account.password).await?;

        // The user row and its verification token are created atomically so a
        // mid-flight failure never leaves an account with no token to redeem.
        let mut tx = self.pool.begin().await?;
        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO users (username, email, password_hash, role_id)
            VALUES ($1, $2, $3, (SELECT id FROM roles WHERE name = 'employee'))
            RETURNING id
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&password_hash)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| match duplicate_field(&e) {
            Some(field) => AuthError::DuplicateUser(field.to_string()),
            None => AuthError::from(e),
        })?;

        let user_id = inserted.ok_or_else(|| {
            AuthError::Database(DatabaseError::QueryError("insert returned no row".to_string()))
        })?;

        let verification_token = issue_verification_token(&mut *tx, user_id.0).await?;
        tx.commit().await?;

        let user = self
            .fetch_user_by_id(user_id.0)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        info!(
            username = %user.username,
            "Registered user; email verification token: {}",
            verification_token
        );

        Ok(RegisteredAccount {
            user: UserSummary::from(&user),
            verification_token,
        })
    }

    /// Authenticate by username or email (case-insensitive) and open a session
    pub async fn login(&self, identity: &str, password_input: &str) -> Result<Session, AuthError> {
        let now = Utc::now();
        let policy = LockoutPolicy::from_config();

        let Some(user) = self.fetch_user_by_identity(identity).await? else {
            // Burn a verification so unknown identities take as long as
            // wrong passwords.
            password::dummy_verify(password_input).await;
            warn!(identity, "Login failed: unknown identity");
            return Err(AuthError::InvalidCredentials);
        };

        if user.is_deactivated() {
            warn!(username = %user.username, "Login rejected: account deactivated");
            return Err(AuthError::AccountDisabled);
        }

        // A locked account is rejected before the password is checked so the
        // response does not reveal whether the password was correct.
        if LockoutPolicy::is_locked(user.locked_until, now) {
            let until = user.locked_until.unwrap_or(now);
            warn!(username = %user.username, %until, "Login rejected: account locked");
            return Err(AuthError::AccountLocked { until });
        }

        if !password::verify_password(password_input, &user.password_hash).await? {
            return match policy.register_failure(user.failed_login_count, user.locked_until, now) {
                LockoutDecision::Count { failed_count } => {
                    self.record_failed_login(user.id, failed_count, None).await?;
                    warn!(
                        username = %user.username,
                        failed_count,
                        "Login failed: wrong password"
                    );
                    Err(AuthError::InvalidCredentials)
                }
                LockoutDecision::Lock { failed_count, locked_until } => {
                    self.record_failed_login(user.id, failed_count, Some(locked_until))
                        .await?;
                    warn!(
                        username = %user.username,
                        failed_count,
                        %locked_until,
                        "Login failed: account locked"
                    );
                    Err(AuthError::AccountLocked { until: locked_until })
                }
            };
        }

        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_count = 0, locked_until = NULL,
                last_login_at = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(username = %user.username, "Login successful");
        self.issue_session(&user, now).await
    }

    /// Exchange a refresh token for a new session, rotating the token
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let now = Utc::now();
        let token_hash = tokens::hash_token(refresh_token);

        let stored: Option<RefreshToken> = sqlx::query_as(
            r#"
            SELECT id, user_id, token_hash, expires_at, revoked_at, created_at
            FROM refresh_tokens WHERE token_hash = $1
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool)
        .await?;

        let stored = match stored {
            Some(token) if token.is_usable(now) => token,
            Some(_) => {
                warn!("Refresh rejected: revoked or expired token presented");
                return Err(AuthError::InvalidToken);
            }
            None => return Err(AuthError::InvalidToken),
        };

        let user = self
            .fetch_user_by_id(stored.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if user.is_deactivated() {
            return Err(AuthError::AccountDisabled);
        }
        if LockoutPolicy::is_locked(user.locked_until, now) {
            let until = user.locked_until.unwrap_or(now);
            return Err(AuthError::AccountLocked { until });
        }

        // Rotation: revoke the presented token and mint a replacement in one
        // transaction, then sign a JWT from the current user row so role
        // changes take effect on refresh.
        let new_refresh = tokens::generate_token();
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE refresh_tokens SET revoked_at = $2 WHERE id = $1")
            .bind(stored.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user.id)
        .bind(tokens::hash_token(&new_refresh))
        .bind(tokens::refresh_expires_at(now))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        let claims = Claims::new(user.id, user.username.clone(), user.role.clone());
        let token = generate_jwt(&claims)?;

        Ok(Session {
            token,
            refresh_token: new_refresh,
            expires_in: claims.expires_in(),
            user: UserSummary::from(&user),
        })
    }

    /// Revoke the presented refresh token. Idempotent: unknown or already
    /// revoked tokens are a no-op success.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(tokens::hash_token(refresh_token))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Mark the account verified if the token is valid, unused, and unexpired.
    /// Consuming the single-use token and flipping the flag commit together;
    /// a failure between the two must not burn the token.
    pub async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let mut tx = self.pool.begin().await?;

        let claimed: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE email_verification_tokens
            SET used_at = now()
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > now()
            RETURNING user_id
            "#,
        )
        .bind(tokens::hash_token(token))
        .fetch_optional(&mut *tx)
        .await?;

        let (user_id,) = claimed.ok_or(AuthError::InvalidToken)?;

        sqlx::query("UPDATE users SET is_verified = true, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(%user_id, "Email verified");
        Ok(())
    }

    /// Change the password after verifying the current one; all outstanding
    /// refresh tokens are revoked so stolen sessions die with the old password.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .fetch_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !password::verify_password(current, &user.password_hash).await? {
            warn!(username = %user.username, "Password change rejected: wrong current password");
            return Err(AuthError::InvalidCredentials);
        }

        password::check_policy(new).map_err(AuthError::Validation)?;
        let new_hash = password::hash_password(new).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(&new_hash)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = now() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(username = %user.username, "Password changed");
        Ok(())
    }

    async fn issue_session(&self, user: &User, now: DateTime<Utc>) -> Result<Session, AuthError> {
        let refresh_token = tokens::generate_token();
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user.id)
        .bind(tokens::hash_token(&refresh_token))
        .bind(tokens::refresh_expires_at(now))
        .execute(&self.pool)
        .await?;

        let claims = Claims::new(user.id, user.username.clone(), user.role.clone());
        let token = generate_jwt(&claims)?;

        Ok(Session {
            token,
            refresh_token,
            expires_in: claims.expires_in(),
            user: UserSummary::from(user),
        })
    }

    async fn record_failed_login(
        &self,
        user_id: Uuid,
        failed_count: i32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            UPDATE users
            SET failed_login_count = $2, locked_until = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(failed_count)
        .bind(locked_until)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_user_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn fetch_user_by_identity(&self, identity: &str) -> Result<Option<User>, AuthError> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users u JOIN roles r ON r.id = u.role_id
            WHERE lower(u.username) = lower($1) OR lower(u.email) = lower($1)
            "#
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(identity)
            .fetch_optional(&self.pool)
            .await?)
    }
}

/// Store a fresh email-verification token, returning the raw value. Takes any
/// executor so callers can run it inside their own transaction.
pub(crate) async fn issue_verification_token<'e>(
    executor: impl sqlx::PgExecutor<'e>,
    user_id: Uuid,
) -> Result<String, AuthError> {
    let raw = tokens::generate_token();
    sqlx::query(
        r#"
        INSERT INTO email_verification_tokens (user_id, token_hash, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(tokens::hash_token(&raw))
    .bind(tokens::verification_expires_at(Utc::now()))
    .execute(executor)
    .await?;
    Ok(raw)
}

/// Map a unique-constraint violation to the offending field name
fn duplicate_field(err: &sqlx::Error) -> Option<&'static str> {
    if let sqlx::Error::Database(db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or_default();
            if constraint.contains("username") {
                return Some("username");
            }
            if constraint.contains("email") {
                return Some("email");
            }
            return Some("account");
        }
    }
    None
}

pub fn validate_username(username: &str) -> Result<(), String> {
    if username.len() < 3 {
        return Err("Username must be at least 3 characters".to_string());
    }
    if username.len() > 50 {
        return Err("Username must be less than 50 characters".to_string());
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err("Username can only contain letters, numbers, underscore, and hyphen".to_string());
    }
    // Length check above guarantees a first character exists
    if !username.chars().next().is_some_and(|c| c.is_alphanumeric()) {
        return Err("Username must start with a letter or number".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() || !parts[1].contains('.') {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("jdoe").is_ok());
        assert!(validate_username("j-doe_42").is_ok());
        assert!(validate_username("jd").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
        assert!(validate_username("j doe").is_err());
        assert!(validate_username("-jdoe").is_err());
        assert!(validate_username("_jdoe").is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("jdoe@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("jdoe").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("jdoe@").is_err());
        assert!(validate_email("jdoe@localhost").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }
}
