/// Notification Sender
///
/// HTTP client for the email-delivery API. Delivery failures surface as hard
/// errors to the caller; nothing is queued or retried here.

use serde::Serialize;

use crate::error::EmailError;
use crate::validators::is_valid_email;

#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    base_url: String,
    sender: SenderEmail,
    frontend_url: String,
}

/// A validated sender address
#[derive(Clone)]
pub struct SenderEmail(String);

impl SenderEmail {
    pub fn parse(s: String) -> Result<Self, EmailError> {
        let email = is_valid_email(&s).map_err(|e| EmailError::ConfigurationError(e.to_string()))?;
        Ok(Self(email))
    }

    pub fn inner(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
pub struct SendEmailRequest {
    from: String,
    to: String,
    #[serde(rename = "Subject")]
    subject: String,
    #[serde(rename = "Html")]
    html: String,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SenderEmail,
        frontend_url: String,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            http_client,
            base_url,
            sender,
            frontend_url,
        }
    }

    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailError> {
        let url = format!("{}/email", self.base_url);
        let request = SendEmailRequest {
            from: self.sender.inner().to_string(),
            to: recipient.to_string(),
            subject: subject.to_string(),
            html: html_content.to_string(),
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send email: {}", e);
                EmailError::SendFailed(e.to_string())
            })?
            .error_for_status()
            .map_err(|e| {
                tracing::error!("Email service returned error: {}", e);
                EmailError::ServiceUnavailable(e.to_string())
            })?;

        Ok(())
    }

    /// Send the email-verification link for a freshly issued token
    pub async fn send_verification_email(
        &self,
        recipient: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let verification_url = format!("{}/verify-email?token={}", self.frontend_url, token);

        let html_content = format!(
            r#"
            <h1>Verify your email address</h1>
            <p>Please verify your email address by clicking the link below:</p>
            <a href="{}">Verify Email</a>
            <p>This link will expire in 30 minutes.</p>
            "#,
            verification_url
        );

        self.send_email(recipient, "Verify your email address", &html_content)
            .await
    }

    /// Send the password-reset link for a freshly issued token
    pub async fn send_password_reset_email(
        &self,
        recipient: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let reset_url = format!("{}/reset-password?token={}", self.frontend_url, token);

        let html_content = format!(
            r#"
            <h1>Reset your password</h1>
            <p>We received a request to reset your password. Click the link below to choose a new one:</p>
            <a href="{}">Reset Password</a>
            <p>This link will expire in 30 minutes. If you did not request a reset, you can ignore this email.</p>
            "#,
            reset_url
        );

        self.send_email(recipient, "Reset your password", &html_content)
            .await
    }
}
