//! Login-failure lockout policy.
//!
//! Pure decision logic: the auth service owns the database writes, this type
//! owns the counting rules. Consecutive failures are counted; reaching the
//! threshold locks the account for a fixed window. The counter resets to zero
//! only on a successful login; a failure arriving after a lock has expired
//! restarts the count at one rather than carrying the stale total forward.

use chrono::{DateTime, Duration, Utc};

use crate::config;

#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_failed_logins: u32,
    pub lockout_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutDecision {
    /// Record the failure and keep counting
    Count { failed_count: i32 },
    /// This failure crossed the threshold: lock the account
    Lock {
        failed_count: i32,
        locked_until: DateTime<Utc>,
    },
}

impl LockoutPolicy {
    pub fn from_config() -> Self {
        let auth = &config::config().auth;
        Self {
            max_failed_logins: auth.max_failed_logins,
            lockout_minutes: auth.lockout_minutes,
        }
    }

    /// Whether a `locked_until` timestamp still blocks logins at `now`
    pub fn is_locked(locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        matches!(locked_until, Some(until) if until > now)
    }

    /// Decide what a failed attempt does to the account's lockout state
    pub fn register_failure(
        &self,
        prior_count: i32,
        prior_lock: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> LockoutDecision {
        // An expired lock means the stale counter no longer applies
        let expired_lock = matches!(prior_lock, Some(until) if until <= now);
        let failed_count = if expired_lock { 1 } else { prior_count.max(0) + 1 };

        if failed_count >= self.max_failed_logins as i32 {
            LockoutDecision::Lock {
                failed_count,
                locked_until: now + Duration::minutes(self.lockout_minutes),
            }
        } else {
            LockoutDecision::Count { failed_count }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy {
            max_failed_logins: 5,
            lockout_minutes: 15,
        }
    }

    #[test]
    fn counts_up_to_threshold() {
        let now = Utc::now();
        let policy = policy();

        for prior in 0..3 {
            assert_eq!(
                policy.register_failure(prior, None, now),
                LockoutDecision::Count { failed_count: prior + 1 }
            );
        }
    }

    #[test]
    fn fifth_failure_locks_for_the_window() {
        let now = Utc::now();
        match policy().register_failure(4, None, now) {
            LockoutDecision::Lock { failed_count, locked_until } => {
                assert_eq!(failed_count, 5);
                assert_eq!(locked_until, now + Duration::minutes(15));
            }
            other => panic!("expected lock, got {:?}", other),
        }
    }

    #[test]
    fn active_lock_blocks() {
        let now = Utc::now();
        assert!(LockoutPolicy::is_locked(Some(now + Duration::minutes(1)), now));
        assert!(!LockoutPolicy::is_locked(Some(now - Duration::minutes(1)), now));
        assert!(!LockoutPolicy::is_locked(None, now));
    }

    #[test]
    fn failure_after_expired_lock_restarts_the_count() {
        let now = Utc::now();
        let expired = Some(now - Duration::minutes(1));

        // Even with a maxed-out stale counter, the first failure after the
        // lock window only counts as one.
        assert_eq!(
            policy().register_failure(5, expired, now),
            LockoutDecision::Count { failed_count: 1 }
        );
    }

    #[test]
    fn lock_expiry_alone_does_not_grant_extra_attempts_forever() {
        let now = Utc::now();
        let policy = policy();

        // After the post-expiry reset, the usual threshold applies again
        let mut count = match policy.register_failure(5, Some(now - Duration::minutes(1)), now) {
            LockoutDecision::Count { failed_count } => failed_count,
            other => panic!("expected count, got {:?}", other),
        };
        loop {
            match policy.register_failure(count, None, now) {
                LockoutDecision::Count { failed_count } => count = failed_count,
                LockoutDecision::Lock { failed_count, .. } => {
                    assert_eq!(failed_count, 5);
                    break;
                }
            }
        }
    }

    #[test]
    fn negative_counter_is_treated_as_zero() {
        let now = Utc::now();
        assert_eq!(
            policy().register_failure(-3, None, now),
            LockoutDecision::Count { failed_count: 1 }
        );
    }
}
