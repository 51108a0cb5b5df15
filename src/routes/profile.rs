/// Profile Routes
///
/// Read and update the authenticated user's account details. The business
/// profile is embedded when one exists; presence is an explicit lookup.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::Claims;
use crate::business;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::users::{self, UserResponse};
use crate::validators::{is_valid_email, is_valid_username};

#[derive(Deserialize)]
pub struct ProfileUpdateRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// GET /auth/me
pub async fn get_user_profile(
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = users::find_by_id(pool.get_ref(), user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    let business = business::find_by_user(pool.get_ref(), user_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": UserResponse::new(&user, business.is_some()),
        "business": business.as_ref().map(business::BusinessResponse::from),
    })))
}

/// PUT /auth/profile
///
/// Partial update of username and email.
///
/// # Errors
/// - 400: Field validation failures
/// - 409: Email already used by another account
pub async fn update_profile(
    form: web::Json<ProfileUpdateRequest>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let username = match form.username.as_deref() {
        Some(username) => Some(is_valid_username(username)?),
        None => None,
    };

    let email = match form.email.as_deref() {
        Some(email) => {
            let email = is_valid_email(email)?;
            if users::email_taken_by_other(pool.get_ref(), &email, user_id).await? {
                return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                    "A user with this email already exists".to_string(),
                )));
            }
            Some(email)
        }
        None => None,
    };

    let user = users::update_profile(
        pool.get_ref(),
        user_id,
        username.as_deref(),
        email.as_deref(),
    )
    .await?;

    let business = business::find_by_user(pool.get_ref(), user_id).await?;

    tracing::info!(user_id = %user_id, "Profile updated");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "user": UserResponse::new(&user, business.is_some()),
        "message": "Profile updated successfully"
    })))
}
