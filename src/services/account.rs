//! Account service - orchestrates the credential lifecycle.
//!
//! Registration, email confirmation, login with lockout, magic-link login,
//! and password reset. Depends only on the store and notifier seams plus the
//! token service, lockout policy, and clock handed in at construction.

use std::sync::Arc;
use validator::Validate;

use crate::dtos::account::{
    ContactRequest, LoginRequest, RegisterRequest, ResetPasswordRequest, SessionResponse,
    UserProfile,
};
use crate::models::User;
use crate::services::error::ServiceError;
use crate::services::lockout::LockoutPolicy;
use crate::services::notifier::Notifier;
use crate::services::token::{TokenPurpose, TokenService};
use crate::store::{CredentialStore, StoreError};
use crate::utils::validation::{normalize_email, validation_message};
use crate::utils::{hash_password, verify_password, Clock};
use uuid::Uuid;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    tokens: TokenService,
    lockout: LockoutPolicy,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        tokens: TokenService,
        lockout: LockoutPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            notifier,
            tokens,
            lockout,
            clock,
        }
    }

    /// Register a new, unconfirmed user and send the confirmation code.
    ///
    /// Delivery is best-effort: a notifier failure is logged and the
    /// registration still succeeds.
    pub async fn register(&self, req: RegisterRequest) -> Result<UserProfile, ServiceError> {
        req.validate()
            .map_err(|e| ServiceError::Validation(validation_message(&e)))?;

        let normalized = normalize_email(&req.email);
        if self
            .store
            .find_user_by_normalized_email(&normalized)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateEmail);
        }

        let password_hash = hash_password(&req.password)?;
        let user = User::new(
            &req.email,
            password_hash,
            req.first_name,
            req.last_name,
            req.phone_number,
            self.clock.now(),
        );

        self.store.create_user(&user).await.map_err(|e| match e {
            StoreError::Duplicate(_) => ServiceError::DuplicateEmail,
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, "User registered");

        match self.tokens.issue_email_confirmation(user.id, &user.email) {
            Ok(code) => {
                if let Err(e) = self
                    .notifier
                    .send_email_confirmation(&user.email, user.id, &code)
                    .await
                {
                    tracing::warn!(user_id = %user.id, error = %e, "Confirmation email failed");
                }
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to issue confirmation token")
            }
        }

        Ok(UserProfile::from(&user))
    }

    /// Confirm a user's email address with a confirmation code.
    ///
    /// Idempotent: confirming an already-confirmed account succeeds without
    /// touching storage.
    pub async fn confirm_email(&self, user_id: Uuid, code: &str) -> Result<(), ServiceError> {
        if code.trim().is_empty() {
            return Err(ServiceError::Validation(
                "Confirmation code is required".to_string(),
            ));
        }

        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        let claims = self.tokens.verify(code, TokenPurpose::EmailConfirmation)?;
        if claims.sub != user_id.to_string() {
            return Err(ServiceError::InvalidToken);
        }

        if user.email_confirmed {
            return Ok(());
        }

        user.email_confirmed = true;
        user.touch(self.clock.now());
        self.store.save_user(&user).await?;

        tracing::info!(user_id = %user.id, "Email confirmed");
        Ok(())
    }

    /// Authenticate with email and password, returning a session token.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    /// Locked accounts are rejected before the password is checked.
    pub async fn login(&self, req: LoginRequest) -> Result<SessionResponse, ServiceError> {
        req.validate()
            .map_err(|e| ServiceError::Validation(validation_message(&e)))?;

        let normalized = normalize_email(&req.email);
        let mut user = self
            .store
            .find_user_by_normalized_email(&normalized)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let now = self.clock.now();
        if self.lockout.is_locked(&user, now) {
            tracing::info!(user_id = %user.id, "Login attempt on locked account");
            return Err(ServiceError::AccountLocked);
        }

        if !verify_password(&req.password, &user.password_hash) {
            self.lockout.record_failure(&mut user, now);
            user.touch(now);
            self.store.save_user(&user).await?;
            tracing::info!(
                user_id = %user.id,
                failed_count = user.access_failed_count,
                "Failed login attempt"
            );
            return Err(ServiceError::InvalidCredentials);
        }

        if !user.email_confirmed {
            return Err(ServiceError::EmailNotConfirmed);
        }

        self.lockout.record_success(&mut user);
        user.touch(now);
        self.store.save_user(&user).await?;

        let issued = self.tokens.issue_session(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(SessionResponse {
            access_token: issued.token,
            token_type: "Bearer".to_string(),
            issued_at: issued.issued_at,
            expires_at: issued.expires_at,
            redirect: None,
        })
    }

    /// Redeem a magic-login code for a session, bypassing the password.
    /// Carries the redirect target embedded at issue time.
    pub async fn magic_login(&self, code: &str) -> Result<SessionResponse, ServiceError> {
        let claims = self.tokens.verify(code, TokenPurpose::MagicLogin)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ServiceError::InvalidToken)?;

        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        let now = self.clock.now();
        if self.lockout.is_locked(&user, now) {
            return Err(ServiceError::AccountLocked);
        }
        if !user.email_confirmed {
            return Err(ServiceError::EmailNotConfirmed);
        }

        self.lockout.record_success(&mut user);
        user.touch(now);
        self.store.save_user(&user).await?;

        let issued = self.tokens.issue_session(&user)?;
        tracing::info!(user_id = %user.id, "User logged in via magic link");

        Ok(SessionResponse {
            access_token: issued.token,
            token_type: "Bearer".to_string(),
            issued_at: issued.issued_at,
            expires_at: issued.expires_at,
            redirect: claims.redirect,
        })
    }

    /// Start a password reset. Always reports success to the caller so that
    /// account existence cannot be probed; a reset code is only issued and
    /// sent when the account exists and is confirmed.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let normalized = normalize_email(email);
        match self.store.find_user_by_normalized_email(&normalized).await {
            Ok(Some(user)) if user.email_confirmed => {
                match self.tokens.issue_password_reset(&user.email) {
                    Ok(code) => {
                        if let Err(e) = self
                            .notifier
                            .send_password_reset(&user.email, user.id, &code)
                            .await
                        {
                            tracing::warn!(user_id = %user.id, error = %e, "Reset email failed");
                        } else {
                            tracing::info!(user_id = %user.id, "Password reset requested");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(user_id = %user.id, error = %e, "Failed to issue reset token")
                    }
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Password reset lookup failed"),
        }
        Ok(())
    }

    /// Complete a password reset with a reset code.
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), ServiceError> {
        req.validate()
            .map_err(|e| ServiceError::Validation(validation_message(&e)))?;
        if req.new_password != req.confirm_password {
            return Err(ServiceError::Validation(
                "Passwords do not match".to_string(),
            ));
        }

        let mut user = self
            .store
            .find_user_by_id(req.user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        let claims = self.tokens.verify(&req.code, TokenPurpose::PasswordReset)?;
        if normalize_email(&claims.sub) != user.normalized_email {
            return Err(ServiceError::InvalidToken);
        }

        user.password_hash = hash_password(&req.new_password)?;
        user.rotate_security_stamp();
        user.touch(self.clock.now());
        self.store.save_user(&user).await?;

        tracing::info!(user_id = %user.id, "Password reset successful");

        if let Err(e) = self
            .notifier
            .send_password_reset_success(&user.email, &user.display_name())
            .await
        {
            tracing::warn!(user_id = %user.id, error = %e, "Reset confirmation email failed");
        }

        Ok(())
    }

    /// Relay a contact-us message. There is no persisted fallback, so a
    /// notifier failure is the operation's failure.
    pub async fn contact_us(&self, req: ContactRequest) -> Result<(), ServiceError> {
        req.validate()
            .map_err(|e| ServiceError::Validation(validation_message(&e)))?;

        self.notifier
            .send_contact_us(
                &req.name,
                &req.email,
                &req.phone,
                &req.registration_number,
                &req.message,
            )
            .await
            .map_err(|e| ServiceError::Notification(e.to_string()))?;

        tracing::info!(email = %req.email, "Contact request relayed");
        Ok(())
    }
}
