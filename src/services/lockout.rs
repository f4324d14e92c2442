//! Lockout policy - pure decision logic over a user's failure-count and
//! lockout-window state.
//!
//! A failed login increments `access_failed_count`; when the post-increment
//! count reaches the threshold the window opens (`lockout_end = now + window`).
//! While the window is open every login attempt is rejected before the
//! password is even checked. Once the window elapses the account is
//! implicitly normal again; no explicit unlock step exists.

use chrono::{DateTime, Duration, Utc};

use crate::config::LockoutConfig;
use crate::models::User;

#[derive(Debug, Clone)]
pub struct LockoutPolicy {
    max_failed_attempts: i32,
    window: Duration,
}

impl LockoutPolicy {
    pub fn new(config: &LockoutConfig) -> Self {
        Self {
            max_failed_attempts: config.max_failed_attempts,
            window: Duration::hours(config.lockout_window_hours),
        }
    }

    /// Whether login attempts must currently be rejected for this user.
    pub fn is_locked(&self, user: &User, now: DateTime<Utc>) -> bool {
        user.lockout_enabled && user.lockout_end.is_some_and(|end| end > now)
    }

    /// Record a failed login attempt. Opens the lockout window only when the
    /// post-increment count reaches the threshold.
    pub fn record_failure(&self, user: &mut User, now: DateTime<Utc>) {
        user.access_failed_count += 1;
        if user.access_failed_count >= self.max_failed_attempts {
            user.lockout_end = Some(now + self.window);
        }
    }

    /// Record a successful login: reset the counter, clear the window.
    pub fn record_success(&self, user: &mut User) {
        user.access_failed_count = 0;
        user.lockout_end = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::new(&LockoutConfig::default())
    }

    fn user() -> User {
        User::new(
            "user@example.com",
            "hash".to_string(),
            None,
            None,
            None,
            Utc::now(),
        )
    }

    #[test]
    fn window_opens_exactly_at_the_threshold() {
        let policy = policy();
        let mut user = user();
        let now = Utc::now();

        for _ in 0..9 {
            policy.record_failure(&mut user, now);
        }
        assert_eq!(user.access_failed_count, 9);
        assert!(user.lockout_end.is_none());
        assert!(!policy.is_locked(&user, now));

        policy.record_failure(&mut user, now);
        assert_eq!(user.access_failed_count, 10);
        assert_eq!(user.lockout_end, Some(now + Duration::hours(24)));
        assert!(policy.is_locked(&user, now));
    }

    #[test]
    fn lock_expires_with_the_window() {
        let policy = policy();
        let mut user = user();
        let now = Utc::now();

        for _ in 0..10 {
            policy.record_failure(&mut user, now);
        }
        assert!(policy.is_locked(&user, now));
        assert!(policy.is_locked(&user, now + Duration::hours(23)));
        assert!(!policy.is_locked(&user, now + Duration::hours(25)));
    }

    #[test]
    fn success_resets_count_and_clears_window() {
        let policy = policy();
        let mut user = user();
        let now = Utc::now();

        for _ in 0..10 {
            policy.record_failure(&mut user, now);
        }
        policy.record_success(&mut user);
        assert_eq!(user.access_failed_count, 0);
        assert!(user.lockout_end.is_none());
        assert!(!policy.is_locked(&user, now));
    }

    #[test]
    fn disabled_lockout_never_locks() {
        let policy = policy();
        let mut user = user();
        user.lockout_enabled = false;
        let now = Utc::now();

        for _ in 0..20 {
            policy.record_failure(&mut user, now);
        }
        assert!(!policy.is_locked(&user, now));
    }
}
