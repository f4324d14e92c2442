use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dtos::account::UserProfile;
use crate::models::Role;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAdminUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub role_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<&Role> for RoleResponse {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id,
            name: role.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserWithRoles {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub roles: Vec<RoleResponse>,
}

/// One page of the admin-user subset (users holding at least one role).
#[derive(Debug, Serialize)]
pub struct PagedUsers {
    pub users: Vec<UserWithRoles>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}
