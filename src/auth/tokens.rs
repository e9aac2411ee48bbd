//! Opaque token generation for refresh and email-verification tokens.
//!
//! Raw tokens are 32 random bytes rendered as hex and handed to the client
//! once; the database only ever sees their SHA-256 digest.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::config;

pub const EMAIL_VERIFICATION_TTL_HOURS: i64 = 24;

/// Generate a fresh opaque token (64 hex chars)
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

/// Digest a raw token for storage or lookup
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn refresh_expires_at(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(config::config().security.refresh_token_ttl_days)
}

pub fn verification_expires_at(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(EMAIL_VERIFICATION_TTL_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_hex_and_distinct() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn hashing_is_stable_and_one_way() {
        let token = generate_token();
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
        assert_eq!(hash_token(&token).len(), 64);
    }

    #[test]
    fn refresh_expiry_uses_configured_ttl() {
        let now = Utc::now();
        let ttl_days = config::config().security.refresh_token_ttl_days;
        assert_eq!(refresh_expires_at(now), now + Duration::days(ttl_days));
        assert_eq!(
            verification_expires_at(now),
            now + Duration::hours(EMAIL_VERIFICATION_TTL_HOURS)
        );
    }
}
