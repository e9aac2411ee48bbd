//! Argon2id password hashing.
//!
//! Hashing and verification are CPU-bound, so both run under
//! `tokio::task::spawn_blocking` to keep them off the async runtime.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::Lazy;
use thiserror::Error;
use tokio::task;

use crate::config;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid Argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),

    #[error("Hashing task panicked")]
    TaskJoin,
}

fn argon2_from_config() -> Result<Argon2<'static>, PasswordError> {
    let auth = &config::config().auth;
    let params = Params::new(
        auth.argon2_memory_cost_kib,
        auth.argon2_time_cost,
        auth.argon2_parallelism,
        None,
    )
    .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password into a PHC string
pub async fn hash_password(password: &str) -> Result<String, PasswordError> {
    let password = password.to_string();

    task::spawn_blocking(move || {
        let argon2 = argon2_from_config()?;
        let salt = SaltString::generate(&mut OsRng);
        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    })
    .await
    .map_err(|_| PasswordError::TaskJoin)?
}

/// Verify a password against a stored PHC string
pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();

    task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|_| PasswordError::TaskJoin)?
}

// Hash of a throwaway password, computed once. Verifying against it when the
// login identity does not exist keeps the unknown-user path as slow as the
// wrong-password path.
static DUMMY_HASH: Lazy<String> = Lazy::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"aep-dummy-password", &salt)
        .map(|hash| hash.to_string())
        .unwrap_or_default()
});

/// Burn one password verification without revealing anything
pub async fn dummy_verify(password: &str) {
    let _ = verify_password(password, &DUMMY_HASH).await;
}

/// Minimum-length password policy from config
pub fn check_policy(password: &str) -> Result<(), String> {
    let min = config::config().auth.min_password_length;
    if password.chars().count() < min {
        return Err(format!("Password must be at least {} characters", min));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery").await.unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).await.unwrap());
        assert!(!verify_password("wrong password", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let a = hash_password("same password").await.unwrap();
        let b = hash_password("same password").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error_not_a_match() {
        let result = verify_password("anything", "not-a-phc-string").await;
        assert!(matches!(result, Err(PasswordError::MalformedHash(_))));
    }

    #[test]
    fn policy_enforces_minimum_length() {
        assert!(check_policy("short").is_err());
        assert!(check_policy("long enough password").is_ok());
    }
}
