use thiserror::Error;

use crate::services::token::TokenError;
use crate::store::StoreError;

/// Failure taxonomy shared by every public service operation.
///
/// Anti-enumeration contracts live in the services themselves: login reports
/// `InvalidCredentials` for unknown email and wrong password alike, and
/// forgot-password never fails at all.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("email is already registered")]
    DuplicateEmail,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("role is already assigned to this user")]
    RoleAlreadyAssigned,

    #[error("role is not assigned to this user")]
    RoleNotAssigned,

    #[error("user does not hold any role")]
    NotAnAdminUser,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("account is locked, try again later")]
    AccountLocked,

    #[error("email address has not been confirmed")]
    EmailNotConfirmed,

    #[error("invalid token")]
    InvalidToken,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("notification failed: {0}")]
    Notification(String),

    #[error("transaction failed and was rolled back: {0}")]
    Transaction(String),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
