pub mod role;
pub mod user;

pub use role::{Role, UserRole, ADMIN_ROLE};
pub use user::User;
