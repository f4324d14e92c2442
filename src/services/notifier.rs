//! Notification seam.
//!
//! Credential flows treat delivery as best-effort: outcomes are logged, never
//! turned into flow failures. The one exception is `contact_us`, whose only
//! effect is the notification itself.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct NotifierError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_email_confirmation(
        &self,
        email: &str,
        user_id: Uuid,
        token: &str,
    ) -> Result<(), NotifierError>;

    async fn send_password_reset(
        &self,
        email: &str,
        user_id: Uuid,
        token: &str,
    ) -> Result<(), NotifierError>;

    async fn send_password_reset_success(
        &self,
        email: &str,
        display_name: &str,
    ) -> Result<(), NotifierError>;

    async fn send_contact_us(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        registration_number: &str,
        message: &str,
    ) -> Result<(), NotifierError>;
}

/// SMTP-backed notifier.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, NotifierError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| NotifierError(e.to_string()))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "SMTP notifier initialized");

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
        })
    }

    async fn send(&self, to_email: &str, subject: &str, body: String) -> Result<(), NotifierError> {
        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| NotifierError(e.to_string()))?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| NotifierError(e.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifierError(e.to_string()))?;

        // Send on the blocking pool to keep the async runtime free.
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| NotifierError(e.to_string()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(NotifierError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_email_confirmation(
        &self,
        email: &str,
        user_id: Uuid,
        token: &str,
    ) -> Result<(), NotifierError> {
        let body = format!(
            "Welcome! Please confirm your email address.\n\n\
             User id: {}\nConfirmation code: {}\n\n\
             If you didn't register, please ignore this email.",
            user_id, token
        );
        self.send(email, "Confirm your email address", body).await
    }

    async fn send_password_reset(
        &self,
        email: &str,
        user_id: Uuid,
        token: &str,
    ) -> Result<(), NotifierError> {
        let body = format!(
            "We received a request to reset your password.\n\n\
             User id: {}\nReset code: {}\n\n\
             If you didn't request this, please ignore this email.",
            user_id, token
        );
        self.send(email, "Reset your password", body).await
    }

    async fn send_password_reset_success(
        &self,
        email: &str,
        display_name: &str,
    ) -> Result<(), NotifierError> {
        let body = format!(
            "Hi {},\n\nYour password was changed successfully. If this wasn't \
             you, contact support immediately.",
            display_name
        );
        self.send(email, "Your password was changed", body).await
    }

    async fn send_contact_us(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        registration_number: &str,
        message: &str,
    ) -> Result<(), NotifierError> {
        let body = format!(
            "Contact request\n\nName: {}\nEmail: {}\nPhone: {}\n\
             Registration number: {}\n\n{}",
            name, email, phone, registration_number, message
        );
        self.send(&self.from_email, "New contact request", body)
            .await
    }
}

/// Notifier that silently accepts everything. Useful for wiring where no
/// delivery channel is configured.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send_email_confirmation(
        &self,
        _email: &str,
        _user_id: Uuid,
        _token: &str,
    ) -> Result<(), NotifierError> {
        Ok(())
    }

    async fn send_password_reset(
        &self,
        _email: &str,
        _user_id: Uuid,
        _token: &str,
    ) -> Result<(), NotifierError> {
        Ok(())
    }

    async fn send_password_reset_success(
        &self,
        _email: &str,
        _display_name: &str,
    ) -> Result<(), NotifierError> {
        Ok(())
    }

    async fn send_contact_us(
        &self,
        _name: &str,
        _email: &str,
        _phone: &str,
        _registration_number: &str,
        _message: &str,
    ) -> Result<(), NotifierError> {
        Ok(())
    }
}
