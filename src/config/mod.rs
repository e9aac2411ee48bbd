use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

/// Fixed development-only JWT secret so `cargo run` works out of the box.
/// Staging/production leave the secret empty unless AEP_JWT_SECRET is set,
/// which makes token issuance fail loudly instead of signing with a known key.
const DEV_JWT_SECRET: &str = "aep-dev-secret-change-me";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub refresh_token_ttl_days: i64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub max_failed_logins: u32,
    pub lockout_minutes: i64,
    pub min_password_length: usize,
    pub argon2_memory_cost_kib: u32,
    pub argon2_time_cost: u32,
    pub argon2_parallelism: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parsed_or(&v, self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT_SECS") {
            self.database.connect_timeout_secs = parsed_or(&v, self.database.connect_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = parsed_or(&v, self.database.enable_query_logging);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = parsed_or(&v, self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_DEFAULT_PAGE_SIZE") {
            self.api.default_page_size = parsed_or(&v, self.api.default_page_size);
        }
        if let Ok(v) = env::var("API_MAX_PAGE_SIZE") {
            self.api.max_page_size = parsed_or(&v, self.api.max_page_size);
        }

        // Security overrides
        if let Ok(v) = env::var("AEP_JWT_SECRET") {
            if !v.is_empty() {
                self.security.jwt_secret = v;
            }
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = parsed_or(&v, self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_REFRESH_TOKEN_TTL_DAYS") {
            self.security.refresh_token_ttl_days = parsed_or(&v, self.security.refresh_token_ttl_days);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // Auth / lockout overrides
        if let Ok(v) = env::var("AUTH_MAX_FAILED_LOGINS") {
            self.auth.max_failed_logins = parsed_or(&v, self.auth.max_failed_logins);
        }
        if let Ok(v) = env::var("AUTH_LOCKOUT_MINUTES") {
            self.auth.lockout_minutes = parsed_or(&v, self.auth.lockout_minutes);
        }
        if let Ok(v) = env::var("AUTH_MIN_PASSWORD_LENGTH") {
            self.auth.min_password_length = parsed_or(&v, self.auth.min_password_length);
        }
        if let Ok(v) = env::var("AUTH_ARGON2_MEMORY_COST_KIB") {
            self.auth.argon2_memory_cost_kib = parsed_or(&v, self.auth.argon2_memory_cost_kib);
        }
        if let Ok(v) = env::var("AUTH_ARGON2_TIME_COST") {
            self.auth.argon2_time_cost = parsed_or(&v, self.auth.argon2_time_cost);
        }
        if let Ok(v) = env::var("AUTH_ARGON2_PARALLELISM") {
            self.auth.argon2_parallelism = parsed_or(&v, self.auth.argon2_parallelism);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connect_timeout_secs: 30,
                enable_query_logging: true,
            },
            api: ApiConfig {
                enable_request_logging: true,
                default_page_size: 25,
                max_page_size: 200,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24,
                refresh_token_ttl_days: 30,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            auth: AuthConfig {
                max_failed_logins: 5,
                lockout_minutes: 15,
                min_password_length: 8,
                argon2_memory_cost_kib: 19 * 1024,
                argon2_time_cost: 2,
                argon2_parallelism: 1,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connect_timeout_secs: 10,
                enable_query_logging: true,
            },
            api: ApiConfig {
                enable_request_logging: true,
                default_page_size: 25,
                max_page_size: 100,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 12,
                refresh_token_ttl_days: 14,
                cors_origins: vec!["https://staging.aep.example.com".to_string()],
            },
            auth: AuthConfig {
                max_failed_logins: 5,
                lockout_minutes: 15,
                min_password_length: 10,
                argon2_memory_cost_kib: 19 * 1024,
                argon2_time_cost: 2,
                argon2_parallelism: 1,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connect_timeout_secs: 5,
                enable_query_logging: false,
            },
            api: ApiConfig {
                enable_request_logging: false,
                default_page_size: 25,
                max_page_size: 100,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                refresh_token_ttl_days: 14,
                cors_origins: vec!["https://aep.example.com".to_string()],
            },
            auth: AuthConfig {
                max_failed_logins: 5,
                lockout_minutes: 30,
                min_password_length: 12,
                argon2_memory_cost_kib: 19 * 1024,
                argon2_time_cost: 3,
                argon2_parallelism: 1,
            },
        }
    }
}

/// Malformed override values fall back to the profile default
fn parsed_or<T: std::str::FromStr>(value: &str, default: T) -> T {
    value.parse().unwrap_or(default)
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

// Helper macros for common checks
#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_profile_has_usable_jwt_secret() {
        let config = AppConfig::development();
        assert_eq!(config.security.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.auth.max_failed_logins, 5);
        assert_eq!(config.auth.lockout_minutes, 15);
    }

    #[test]
    fn production_profile_is_stricter() {
        let config = AppConfig::production();
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.security.jwt_expiry_hours < AppConfig::development().security.jwt_expiry_hours);
        assert!(config.auth.lockout_minutes > AppConfig::development().auth.lockout_minutes);
        assert!(config.auth.min_password_length >= 12);
        assert!(!config.database.enable_query_logging);
    }

    // Pure helper, so no test here has to mutate process-wide env vars
    #[test]
    fn malformed_override_falls_back_to_profile_default() {
        assert_eq!(parsed_or("not-a-number", 5u32), 5);
        assert_eq!(parsed_or("7", 5u32), 7);
        assert_eq!(parsed_or("yes", false), false);
        assert_eq!(parsed_or("true", false), true);
    }
}
