//! User model - the identity record at the center of every credential flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::validation::normalize_email;

/// User entity.
///
/// `normalized_email` is the globally unique lookup key. The pair
/// (`access_failed_count`, `lockout_end`) encodes lockout state and is only
/// interpreted through the lockout policy. `is_admin` mirrors whether the
/// user currently holds the ADMIN role and is kept in sync by the role
/// service on every (un)assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub normalized_email: String,
    pub password_hash: String,
    pub email_confirmed: bool,
    pub phone_number: Option<String>,
    pub lockout_enabled: bool,
    pub access_failed_count: i32,
    pub lockout_end: Option<DateTime<Utc>>,
    pub is_admin: bool,
    pub security_stamp: String,
    pub concurrency_stamp: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl User {
    /// Create a new unconfirmed user with fresh stamps.
    pub fn new(
        email: &str,
        password_hash: String,
        first_name: Option<String>,
        last_name: Option<String>,
        phone_number: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.trim().to_string(),
            normalized_email: normalize_email(email),
            password_hash,
            email_confirmed: false,
            phone_number,
            lockout_enabled: true,
            access_failed_count: 0,
            lockout_end: None,
            is_admin: false,
            security_stamp: Uuid::new_v4().to_string(),
            concurrency_stamp: Uuid::new_v4().to_string(),
            first_name,
            last_name,
            created_at: now,
            modified_at: now,
        }
    }

    /// Human-readable name, falling back to the email address.
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.to_string(),
            (None, Some(last)) => last.to_string(),
            (None, None) => self.email.clone(),
        }
    }

    /// Rotate the security stamp. Called whenever credentials change so that
    /// previously issued session trust can be invalidated downstream.
    pub fn rotate_security_stamp(&mut self) {
        self.security_stamp = Uuid::new_v4().to_string();
    }

    /// Refresh the concurrency stamp and modification timestamp before a save.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.concurrency_stamp = Uuid::new_v4().to_string();
        self.modified_at = now;
    }
}
