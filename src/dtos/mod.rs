pub mod account;
pub mod admin;

pub use account::{
    ContactRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, SessionResponse,
    UserProfile,
};
pub use admin::{CreateAdminUserRequest, PagedUsers, RoleResponse, UserWithRoles};
