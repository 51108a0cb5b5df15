/// Email Verification Routes
///
/// Verifying consumes a single-use token and flips the user's verified flag
/// exactly once. Resending issues a fresh token; older ones simply age out.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::{self, Claims, TokenKind};
use crate::email_client::EmailClient;
use crate::error::{AppError, AuthError, ErrorContext, ValidationError};
use crate::request_logging::{AuditLog, RequestFailureLogger};
use crate::security::RateLimiters;
use crate::users;

#[derive(Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// POST /auth/verify-email
///
/// Validates and consumes an email-verification token. Unknown, expired,
/// and already-consumed tokens all get the same 400 message.
pub async fn verify_email(
    form: web::Json<VerifyEmailRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("verify_email");

    let token =
        auth::validate_token(pool.get_ref(), &form.token, TokenKind::EmailVerification).await?;

    // The conditional update is the double-use guard; only one concurrent
    // consumer of this token gets past it
    auth::consume_token(pool.get_ref(), &token.token).await?;

    users::mark_email_verified(pool.get_ref(), token.user_id).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %token.user_id,
        "Email verified successfully"
    );

    RequestFailureLogger::log_audit(
        &AuditLog::new("CONSUME_TOKEN", "token", "SUCCESS", "Email verified")
            .with_resource_id(token.user_id.to_string()),
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Email verified successfully"
    })))
}

/// POST /auth/resend-verification-email
///
/// Issues a fresh verification token for the authenticated user.
///
/// # Errors
/// - 400: Email already verified
/// - 429: Rate limited (keyed by user, not IP)
/// - 503: Email could not be delivered
pub async fn resend_verification_email(
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    rate_limiters: web::Data<RateLimiters>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("resend_verification_email").with_user_id(claims.sub.clone());
    let user_id = claims.user_id()?;

    rate_limiters.resend.check(&claims.sub)?;

    let user = users::find_by_id(pool.get_ref(), user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    if user.email_verified {
        return Err(AppError::Validation(ValidationError::InvalidState(
            "Email is already verified".to_string(),
        )));
    }

    let verification_token =
        auth::issue_token(pool.get_ref(), user.id, TokenKind::EmailVerification).await?;

    email_client
        .send_verification_email(&user.email, &verification_token.token)
        .await
        .map_err(|e| {
            let error = AppError::Email(e);
            context.log_error(&error);
            error
        })?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        "Verification email resent"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Verification email sent successfully"
    })))
}
