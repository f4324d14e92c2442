//! Role and user-role models - static reference data plus the join rows
//! that grant it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalized name of the role that drives the `User::is_admin` flag.
pub const ADMIN_ROLE: &str = "ADMIN";

/// Role entity. Static reference data; `normalized_name` is the uppercase
/// lookup form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub normalized_name: String,
}

impl Role {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            normalized_name: name.trim().to_uppercase(),
        }
    }

    pub fn is_admin_role(&self) -> bool {
        self.normalized_name == ADMIN_ROLE
    }
}

/// Join row granting a role to a user, unique per (user, role) pair.
/// Assigning an already-held role is a conflict, never an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

impl UserRole {
    pub fn new(user_id: Uuid, role_id: Uuid) -> Self {
        Self { user_id, role_id }
    }
}
