//! Purpose-scoped token issuance and verification.
//!
//! Tokens are self-contained signed claim sets; verifying one needs the
//! signing secret and the clock, never a store lookup. Every token carries a
//! `purpose` claim that must match the verifying operation's expectation, so
//! a password-reset code can never be replayed as a session token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::models::User;
use crate::utils::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenPurpose {
    #[serde(rename = "session")]
    Session,
    #[serde(rename = "email-confirmation")]
    EmailConfirmation,
    #[serde(rename = "password-reset")]
    PasswordReset,
    #[serde(rename = "magic-login")]
    MagicLogin,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::Session => "session",
            TokenPurpose::EmailConfirmation => "email-confirmation",
            TokenPurpose::PasswordReset => "password-reset",
            TokenPurpose::MagicLogin => "magic-login",
        }
    }
}

impl fmt::Display for TokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is invalid")]
    Invalid,

    #[error("token has expired")]
    Expired,

    #[error("token purpose mismatch: expected {expected}, got {actual}")]
    PurposeMismatch {
        expected: TokenPurpose,
        actual: TokenPurpose,
    },
}

/// Signed claim set carried by every token.
///
/// `sub` is the user id for session / confirmation / magic-login tokens and
/// the email address for password-reset tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub purpose: TokenPurpose,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// Session token together with its validity window.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Token service for purpose-scoped token generation and validation.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: TokenConfig,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(config: TokenConfig, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            encoding_key,
            decoding_key,
            config,
            clock,
        }
    }

    /// Issue a session token: issuer/audience bound, carries the admin claim.
    pub fn issue_session(&self, user: &User) -> Result<IssuedToken, anyhow::Error> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + Duration::hours(self.config.session_ttl_hours);

        let claims = TokenClaims {
            sub: user.id.to_string(),
            purpose: TokenPurpose::Session,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            iss: Some(self.config.issuer.clone()),
            aud: Some(self.config.audience.clone()),
            is_admin: Some(user.is_admin),
            email: None,
            redirect: None,
        };

        Ok(IssuedToken {
            token: self.encode(&claims)?,
            issued_at,
            expires_at,
        })
    }

    /// Issue an email-confirmation token bound to the new user's id.
    pub fn issue_email_confirmation(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<String, anyhow::Error> {
        let now = self.clock.now();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            purpose: TokenPurpose::EmailConfirmation,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.config.confirmation_ttl_hours)).timestamp(),
            iss: None,
            aud: None,
            is_admin: None,
            email: Some(email.to_string()),
            redirect: None,
        };
        self.encode(&claims)
    }

    /// Issue a password-reset token whose subject is the account email.
    pub fn issue_password_reset(&self, email: &str) -> Result<String, anyhow::Error> {
        let now = self.clock.now();
        let claims = TokenClaims {
            sub: email.to_string(),
            purpose: TokenPurpose::PasswordReset,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.config.reset_ttl_hours)).timestamp(),
            iss: None,
            aud: None,
            is_admin: None,
            email: Some(email.to_string()),
            redirect: None,
        };
        self.encode(&claims)
    }

    /// Issue a magic-login token carrying the user id and an optional
    /// post-login redirect target.
    pub fn issue_magic_login(
        &self,
        user_id: Uuid,
        redirect: Option<&str>,
    ) -> Result<String, anyhow::Error> {
        let now = self.clock.now();
        let claims = TokenClaims {
            sub: user_id.to_string(),
            purpose: TokenPurpose::MagicLogin,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.config.magic_login_ttl_minutes)).timestamp(),
            iss: None,
            aud: None,
            is_admin: None,
            email: None,
            redirect: redirect.map(str::to_string),
        };
        self.encode(&claims)
    }

    /// Validate signature, expiry, purpose, and (for session tokens)
    /// issuer/audience. Pure: two concurrent verifications never interfere.
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock below.
        validation.validate_exp = false;
        validation.validate_aud = false;

        let data =
            decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!(error = %e, "Token failed signature/structure check");
                TokenError::Invalid
            })?;
        let claims = data.claims;

        if self.clock.now().timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }

        if claims.purpose != expected {
            return Err(TokenError::PurposeMismatch {
                expected,
                actual: claims.purpose,
            });
        }

        if expected == TokenPurpose::Session {
            let issuer_ok = claims.iss.as_deref() == Some(self.config.issuer.as_str());
            let audience_ok = claims.aud.as_deref() == Some(self.config.audience.as_str());
            if !issuer_ok || !audience_ok {
                return Err(TokenError::Invalid);
            }
        }

        Ok(claims)
    }

    fn encode(&self, claims: &TokenClaims) -> Result<String, anyhow::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))
    }
}
