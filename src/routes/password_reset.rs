/// Password Reset Routes
///
/// The request endpoint never reveals whether an account exists; the reset
/// endpoint consumes the token, replaces the credential, and tears down every
/// outstanding session.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::{self, hash_password, invalidate_all_for_user, TokenKind};
use crate::email_client::EmailClient;
use crate::error::{AppError, ErrorContext};
use crate::request_logging::{AuditLog, RequestFailureLogger};
use crate::security::RateLimiters;
use crate::users;
use crate::validators::{is_valid_email, passwords_match};

const RESET_REQUEST_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

#[derive(Deserialize)]
pub struct PasswordResetRequestBody {
    pub email: String,
}

#[derive(Deserialize)]
pub struct PasswordResetBody {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

fn client_ip(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// POST /auth/password-reset-request
///
/// Always answers 200 with the same message whether or not the account
/// exists. When it does, a reset token is issued and mailed; a delivery
/// failure still surfaces as 503 rather than being swallowed.
pub async fn password_reset_request(
    form: web::Json<PasswordResetRequestBody>,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    rate_limiters: web::Data<RateLimiters>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("password_reset_request");

    rate_limiters.credential.check(&client_ip(&req))?;

    let email = is_valid_email(&form.email)?;

    if let Some(user) = users::find_by_email(pool.get_ref(), &email).await? {
        let reset_token =
            auth::issue_token(pool.get_ref(), user.id, TokenKind::PasswordReset).await?;

        email_client
            .send_password_reset_email(&user.email, &reset_token.token)
            .await
            .map_err(|e| {
                let error = AppError::Email(e);
                context.log_error(&error);
                error
            })?;

        tracing::info!(
            request_id = %context.request_id,
            user_id = %user.id,
            "Password reset token issued"
        );
    } else {
        // Unknown email: same outward response, nothing issued
        tracing::info!(
            request_id = %context.request_id,
            "Password reset requested for unknown email"
        );
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": RESET_REQUEST_MESSAGE
    })))
}

/// POST /auth/password-reset
///
/// Consumes a reset token and replaces the password. Completing a reset
/// proves control of the inbox, so the email is marked verified, and every
/// refresh token the user holds is invalidated.
///
/// # Errors
/// - 400: Password rule failures (field-keyed), or the uniform
///   invalid-or-expired token message
pub async fn password_reset(
    form: web::Json<PasswordResetBody>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("password_reset");

    passwords_match(&form.new_password, &form.confirm_password)?;
    let password_hash = hash_password(&form.new_password)?;

    let token = auth::validate_token(pool.get_ref(), &form.token, TokenKind::PasswordReset).await?;

    // Winning the conditional update makes this request the single consumer
    auth::consume_token(pool.get_ref(), &token.token).await?;

    users::set_password_hash(pool.get_ref(), token.user_id, &password_hash).await?;
    users::mark_email_verified(pool.get_ref(), token.user_id).await?;
    invalidate_all_for_user(pool.get_ref(), token.user_id).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %token.user_id,
        "Password reset completed, all sessions invalidated"
    );

    RequestFailureLogger::log_audit(
        &AuditLog::new(
            "RESET_PASSWORD",
            "user",
            "SUCCESS",
            "Password reset, all refresh tokens invalidated",
        )
        .with_resource_id(token.user_id.to_string()),
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password reset successful"
    })))
}
