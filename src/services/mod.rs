//! Services layer.
//!
//! Business logic for the credential lifecycle and role provisioning, built
//! on the store, notifier, and clock seams injected at construction.

mod account;
pub mod error;
mod lockout;
mod notifier;
mod role;
mod token;

pub use account::AccountService;
pub use error::ServiceError;
pub use lockout::LockoutPolicy;
pub use notifier::{NoopNotifier, Notifier, NotifierError, SmtpNotifier};
pub use role::RoleService;
pub use token::{IssuedToken, TokenClaims, TokenError, TokenPurpose, TokenService};
