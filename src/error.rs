// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::JwtError;
use crate::database::DatabaseError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),
    // Lockout is a 403 with its own code so clients can present it distinctly
    AccountLocked(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::AccountLocked(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::AccountLocked(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::AccountLocked(_) => "ACCOUNT_LOCKED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        match self {
            ApiError::ValidationError { message, field_errors } => {
                let mut response = json!({
                    "error": true,
                    "message": message,
                    "code": "VALIDATION_ERROR"
                });

                if let Some(field_errors) = field_errors {
                    response["field_errors"] = json!(field_errors);
                }

                response
            }
            _ => {
                json!({
                    "error": true,
                    "message": self.message(),
                    "code": self.error_code()
                })
            }
        }
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(
        message: impl Into<String>,
        field_errors: Option<HashMap<String, String>>,
    ) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database configuration error: {}", err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            DatabaseError::MigrationError(msg) => {
                tracing::error!("Migration error: {}", msg);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            // Connectivity failures are a degraded-service condition, not a bug
            DatabaseError::Sqlx(
                sqlx_err @ (sqlx::Error::PoolTimedOut
                | sqlx::Error::PoolClosed
                | sqlx::Error::Io(_)
                | sqlx::Error::Tls(_)),
            ) => {
                tracing::error!("Database connectivity error: {}", sqlx_err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
        }
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken(msg) => ApiError::unauthorized(format!("Invalid JWT token: {}", msg)),
            JwtError::InvalidSecret => {
                tracing::error!("JWT secret is not configured; set AEP_JWT_SECRET");
                ApiError::internal_server_error("Token signing is not configured")
            }
            JwtError::TokenGeneration(msg) => {
                tracing::error!("JWT generation failed: {}", msg);
                ApiError::internal_server_error("Failed to issue token")
            }
        }
    }
}

impl From<crate::services::auth_service::AuthError> for ApiError {
    fn from(err: crate::services::auth_service::AuthError) -> Self {
        use crate::services::auth_service::AuthError;
        match err {
            AuthError::InvalidCredentials => ApiError::unauthorized("Invalid credentials"),
            AuthError::AccountLocked { until } => ApiError::AccountLocked(format!(
                "Account is locked until {}",
                until.to_rfc3339()
            )),
            AuthError::AccountDisabled => ApiError::forbidden("Account is deactivated"),
            AuthError::DuplicateUser(field) => {
                ApiError::conflict(format!("A user with that {} already exists", field))
            }
            AuthError::InvalidToken => ApiError::unauthorized("Invalid or expired token"),
            AuthError::Validation(msg) => ApiError::validation_error(msg, None),
            AuthError::Hash(e) => {
                tracing::error!("Password hashing error: {}", e);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
            AuthError::Jwt(e) => ApiError::from(e),
            AuthError::Database(e) => ApiError::from(e),
        }
    }
}

impl From<crate::services::user_service::UserError> for ApiError {
    fn from(err: crate::services::user_service::UserError) -> Self {
        use crate::services::user_service::UserError;
        match err {
            UserError::NotFound => ApiError::not_found("User not found"),
            UserError::Validation(msg) => ApiError::validation_error(msg, None),
            UserError::DuplicateEmail => ApiError::conflict("A user with that email already exists"),
            UserError::UnknownRole(name) => ApiError::bad_request(format!("Unknown role: {}", name)),
            UserError::SelfAction(msg) => ApiError::bad_request(msg),
            UserError::Database(e) => ApiError::from(e),
        }
    }
}

impl From<crate::services::training_service::TrainingError> for ApiError {
    fn from(err: crate::services::training_service::TrainingError) -> Self {
        use crate::services::training_service::TrainingError;
        match err {
            TrainingError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            TrainingError::Validation(msg) => ApiError::validation_error(msg, None),
            TrainingError::Forbidden(msg) => ApiError::forbidden(msg),
            TrainingError::InvalidState(msg) => ApiError::conflict(msg),
            TrainingError::DuplicateCode(code) => {
                ApiError::conflict(format!("A course with code '{}' already exists", code))
            }
            TrainingError::UnknownCourse => ApiError::bad_request("Referenced course does not exist"),
            TrainingError::Database(e) => ApiError::from(e),
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::AuthError;
    use chrono::Utc;

    #[test]
    fn status_and_code_mapping() {
        assert_eq!(ApiError::bad_request("x").status_code(), 400);
        assert_eq!(ApiError::unauthorized("x").status_code(), 401);
        assert_eq!(ApiError::forbidden("x").status_code(), 403);
        assert_eq!(ApiError::AccountLocked("x".into()).status_code(), 403);
        assert_eq!(ApiError::not_found("x").status_code(), 404);
        assert_eq!(ApiError::conflict("x").status_code(), 409);
        assert_eq!(ApiError::internal_server_error("x").status_code(), 500);
        assert_eq!(ApiError::service_unavailable("x").status_code(), 503);

        assert_eq!(ApiError::AccountLocked("x".into()).error_code(), "ACCOUNT_LOCKED");
    }

    #[test]
    fn connectivity_failures_are_service_unavailable() {
        use crate::database::DatabaseError;

        assert_eq!(
            ApiError::from(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)).status_code(),
            503
        );
        assert_eq!(
            ApiError::from(DatabaseError::Sqlx(sqlx::Error::PoolClosed)).status_code(),
            503
        );
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(
            ApiError::from(DatabaseError::Sqlx(sqlx::Error::Io(refused))).status_code(),
            503
        );

        // Query-shaped failures stay internal errors
        assert_eq!(
            ApiError::from(DatabaseError::Sqlx(sqlx::Error::RowNotFound)).status_code(),
            500
        );
    }

    #[test]
    fn body_shape() {
        let body = ApiError::conflict("duplicate").to_json();
        assert_eq!(body["error"], true);
        assert_eq!(body["message"], "duplicate");
        assert_eq!(body["code"], "CONFLICT");
    }

    #[test]
    fn validation_error_includes_field_errors() {
        let mut fields = HashMap::new();
        fields.insert("email".to_string(), "Invalid email format".to_string());
        let body = ApiError::validation_error("Invalid fields", Some(fields)).to_json();
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["email"], "Invalid email format");
    }

    #[test]
    fn auth_errors_map_per_policy() {
        assert_eq!(ApiError::from(AuthError::InvalidCredentials).status_code(), 401);
        assert_eq!(
            ApiError::from(AuthError::AccountLocked { until: Utc::now() }).error_code(),
            "ACCOUNT_LOCKED"
        );
        assert_eq!(
            ApiError::from(AuthError::DuplicateUser("email".to_string())).status_code(),
            409
        );
        assert_eq!(ApiError::from(AuthError::AccountDisabled).status_code(), 403);
        assert_eq!(ApiError::from(AuthError::InvalidToken).status_code(), 401);
    }
}
