/// Authentication Routes
///
/// Handles signup, login, token refresh, logout, and password change.
/// The refresh token travels in an HttpOnly cookie; the access token is
/// returned in the body for the client to attach as a bearer credential.

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{
    self, authenticate, hash_password, invalidate_all_for_user, invalidate_refresh_token,
    issue_session, refresh_access_token, refresh_lifetime_seconds, verify_password, Claims,
    TokenKind,
};
use crate::business;
use crate::configuration::JwtSettings;
use crate::email_client::EmailClient;
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext, ValidationError};
use crate::request_logging::{AuditLog, RequestFailureLogger, RequestMetadata};
use crate::security::RateLimiters;
use crate::users::{self, UserResponse};
use crate::validators::{is_valid_email, passwords_match};

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

const SIGNUP_MESSAGE: &str =
    "Account created successfully. Please check your email to verify your account.";

/// Signup request
#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// Password change request
#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Login response with the access token and user payload
#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business: Option<business::BusinessResponse>,
    pub message: String,
}

/// Refresh response carrying only the new access token
#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Builds the refresh-token cookie with an expiry matching the ledger record
fn refresh_token_cookie(token: &str, lifetime_seconds: i64) -> Cookie<'static> {
    Cookie::build(REFRESH_TOKEN_COOKIE, token.to_string())
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(lifetime_seconds))
        .finish()
}

/// Expires the refresh-token cookie immediately
fn clear_refresh_token_cookie() -> Cookie<'static> {
    Cookie::build(REFRESH_TOKEN_COOKIE, "")
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::ZERO)
        .finish()
}

fn client_ip(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// POST /auth/signup
///
/// Creates an unverified account and emails a verification link.
///
/// # Security Notes
/// - A duplicate email gets the same success-shaped 201 without creating
///   anything, so signup cannot be used to probe which emails exist
/// - Email delivery failure aborts the request (503); the created user and
///   token rows stay behind
///
/// # Errors
/// - 400: Validation errors (email format, password rules, mismatch)
/// - 429: Rate limited
/// - 503: Verification email could not be delivered
pub async fn signup(
    form: web::Json<SignupRequest>,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    rate_limiters: web::Data<RateLimiters>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("signup");

    rate_limiters.credential.check(&client_ip(&req))?;

    let email = is_valid_email(&form.email)?;
    passwords_match(&form.password, &form.confirm_password)?;
    let password_hash = hash_password(&form.password)?;

    if users::email_exists(pool.get_ref(), &email).await? {
        RequestFailureLogger::log_audit(&AuditLog::new(
            "CREATE_USER",
            "user",
            "FAILURE",
            "Signup attempted with an already registered email",
        ));

        // Same response shape as a successful signup; nothing is created
        return Ok(HttpResponse::Created().json(serde_json::json!({
            "message": SIGNUP_MESSAGE
        })));
    }

    let user = match users::create_user(pool.get_ref(), &email, &password_hash).await {
        Ok(user) => user,
        // A concurrent signup won the unique constraint; same policy applies
        Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_))) => {
            return Ok(HttpResponse::Created().json(serde_json::json!({
                "message": SIGNUP_MESSAGE
            })));
        }
        Err(e) => {
            context.log_error(&e);
            return Err(e);
        }
    };

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
        "User signed up successfully"
    );

    RequestFailureLogger::log_audit(
        &AuditLog::new("CREATE_USER", "user", "SUCCESS", "Account created")
            .with_resource_id(user.id.to_string()),
    );

    Ok(HttpResponse::Created().json(serde_json::json!({
        "user": UserResponse::new(&user, false),
        "message": SIGNUP_MESSAGE
    })))
}

/// POST /auth/login
///
/// Authenticates email/password and issues a session: access token in the
/// body, refresh token in an HttpOnly cookie whose lifetime follows the
/// remember-me choice.
///
/// # Errors
/// - 401: Invalid credentials (same message whether the email exists or not)
/// - 403: Account disabled
/// - 429: Rate limited
pub async fn login(
    form: web::Json<LoginRequest>,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
    rate_limiters: web::Data<RateLimiters>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("login");

    rate_limiters.credential.check(&client_ip(&req))?;

    let user = authenticate(pool.get_ref(), &form.email, &form.password)
        .await
        .map_err(|e| {
            let metadata = RequestMetadata::new(
                context.request_id.clone(),
                "POST".to_string(),
                "/auth/login".to_string(),
            )
            .with_client_ip(client_ip(&req));
            RequestFailureLogger::log_failed_request(&metadata, "AuthError", &e.to_string());

            RequestFailureLogger::log_audit(&AuditLog::new(
                "LOGIN",
                "session",
                "FAILURE",
                format!("Login rejected: {}", e),
            ));
            e
        })?;

    users::set_remember_me(pool.get_ref(), user.id, form.remember_me).await?;
    auth::touch_activity(pool.get_ref(), user.id).await?;

    let tokens = issue_session(pool.get_ref(), &user, form.remember_me, jwt_config.get_ref()).await?;
    let lifetime = refresh_lifetime_seconds(jwt_config.get_ref(), form.remember_me);

    let business = business::find_by_user(pool.get_ref(), user.id).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.id,
        remember_me = form.remember_me,
        "User logged in successfully"
    );

    RequestFailureLogger::log_audit(
        &AuditLog::new("LOGIN", "session", "SUCCESS", "Login successful")
            .with_resource_id(user.id.to_string()),
    );

    let response = LoginResponse {
        access_token: tokens.access_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
        user: UserResponse::new(&user, business.is_some()),
        business: business.as_ref().map(business::BusinessResponse::from),
        message: "Login successful".to_string(),
    };

    Ok(HttpResponse::Ok()
        .cookie(refresh_token_cookie(&tokens.refresh_token, lifetime))
        .json(response))
}

/// POST /auth/refresh
///
/// Mints a new access token from the refresh-token cookie. The ledger record
/// is reused, not rotated; it stays valid until its own expiry or revocation.
///
/// # Errors
/// - 401: Missing cookie, or uniform invalid-token failure for
///   not-found/expired/invalidated records
pub async fn refresh(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = req
        .cookie(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Auth(AuthError::MissingToken))?;

    let (access_token, user) =
        refresh_access_token(pool.get_ref(), &refresh_token, jwt_config.get_ref()).await?;

    tracing::debug!(user_id = %user.id, "Access token refreshed");

    Ok(HttpResponse::Ok().json(RefreshResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.access_token_expiry,
    }))
}

/// POST /auth/logout
///
/// Invalidates the cookie's ledger record and clears the cookie. A missing or
/// already-invalidated record is not an error.
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    if let Some(cookie) = req.cookie(REFRESH_TOKEN_COOKIE) {
        invalidate_refresh_token(pool.get_ref(), cookie.value()).await?;
    }

    RequestFailureLogger::log_audit(
        &AuditLog::new("LOGOUT", "session", "SUCCESS", "Logout successful")
            .with_resource_id(claims.sub.clone()),
    );

    Ok(HttpResponse::Ok()
        .cookie(clear_refresh_token_cookie())
        .json(serde_json::json!({
            "message": "Logout successful"
        })))
}

/// PUT /auth/change-password
///
/// Verifies the current password, applies the new one, and invalidates every
/// outstanding refresh token for the user: any credential-changing event
/// tears down all sessions.
///
/// # Errors
/// - 400: Wrong current password, new password same as current, complexity
///   failures, mismatch (all field-keyed)
pub async fn change_password(
    form: web::Json<ChangePasswordRequest>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("change_password").with_user_id(claims.sub.clone());
    let user_id = claims.user_id()?;

    let user = users::find_by_id(pool.get_ref(), user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    let current_valid = verify_password(&form.current_password, &user.password_hash)?;
    if !current_valid {
        return Err(AppError::Validation(ValidationError::FieldMismatch(
            "current_password".to_string(),
        )));
    }

    if form.current_password == form.new_password {
        return Err(AppError::Validation(ValidationError::MustDiffer(
            "new_password".to_string(),
        )));
    }

    passwords_match(&form.new_password, &form.confirm_password)?;
    let password_hash = hash_password(&form.new_password)?;

    users::set_password_hash(pool.get_ref(), user_id, &password_hash).await?;
    invalidate_all_for_user(pool.get_ref(), user_id).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "Password changed, all sessions invalidated"
    );

    RequestFailureLogger::log_audit(
        &AuditLog::new(
            "CHANGE_PASSWORD",
            "user",
            "SUCCESS",
            "Password changed, all refresh tokens invalidated",
        )
        .with_resource_id(user_id.to_string()),
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password changed successfully. Please login again."
    })))
}
