use serde::Deserialize;
use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

/// Top-level configuration for the identity core.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub token: TokenConfig,
    pub lockout: LockoutConfig,
    pub smtp: SmtpConfig,
}

/// Signing secret, issuer/audience binding, and ttl defaults for tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_hours: i64,
    pub confirmation_ttl_hours: i64,
    pub reset_ttl_hours: i64,
    pub magic_login_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockoutConfig {
    pub max_failed_attempts: i32,
    pub lockout_window_hours: i64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: 10,
            lockout_window_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub from_email: String,
}

impl IdentityConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            token: TokenConfig {
                secret: get_env("TOKEN_SIGNING_SECRET", None)?,
                issuer: get_env("TOKEN_ISSUER", Some("identity-service"))?,
                audience: get_env("TOKEN_AUDIENCE", Some("identity-clients"))?,
                session_ttl_hours: parse_env("SESSION_TTL_HOURS", "24")?,
                confirmation_ttl_hours: parse_env("EMAIL_CONFIRMATION_TTL_HOURS", "6")?,
                reset_ttl_hours: parse_env("PASSWORD_RESET_TTL_HOURS", "6")?,
                magic_login_ttl_minutes: parse_env("MAGIC_LOGIN_TTL_MINUTES", "15")?,
            },
            lockout: LockoutConfig {
                max_failed_attempts: parse_env("LOCKOUT_MAX_FAILED_ATTEMPTS", "10")?,
                lockout_window_hours: parse_env("LOCKOUT_WINDOW_HOURS", "24")?,
            },
            smtp: SmtpConfig {
                host: get_env("SMTP_HOST", Some("smtp.gmail.com"))?,
                user: get_env("SMTP_USER", None)?,
                password: get_env("SMTP_PASSWORD", None)?,
                from_email: get_env("SMTP_FROM_EMAIL", None)?,
            },
        })
    }
}

fn get_env(name: &'static str, default: Option<&str>) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => default
            .map(|d| d.to_string())
            .ok_or(ConfigError::MissingVar(name)),
    }
}

fn parse_env<T>(name: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(name, Some(default))?
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            name,
            message: e.to_string(),
        })
}
