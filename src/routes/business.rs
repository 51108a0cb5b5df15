/// Business Profile Routes
///
/// Each user sets up at most one business. Absence is reported with a setup
/// prompt rather than an empty body.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::Claims;
use crate::business::{self, BusinessResponse};
use crate::error::{AppError, DatabaseError, ValidationError};
use crate::validators::{is_valid_business_name, is_valid_currency};

#[derive(Deserialize)]
pub struct BusinessSetupRequest {
    pub business_name: String,
    pub currency: String,
    pub business_logo: Option<String>,
}

#[derive(Deserialize)]
pub struct BusinessUpdateRequest {
    pub business_name: Option<String>,
    pub currency: Option<String>,
    pub business_logo: Option<String>,
    pub business_type: Option<String>,
}

/// POST /business/setup
///
/// # Errors
/// - 400: Field validation failures, or the user already has a business
pub async fn setup_business(
    form: web::Json<BusinessSetupRequest>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let business_name = is_valid_business_name(&form.business_name)?;
    let currency = is_valid_currency(&form.currency)?;

    if business::find_by_user(pool.get_ref(), user_id).await?.is_some() {
        return Err(AppError::Validation(ValidationError::InvalidState(
            "User already has a business setup".to_string(),
        )));
    }

    let business = business::create(
        pool.get_ref(),
        user_id,
        &business_name,
        &currency,
        form.business_logo.as_deref(),
    )
    .await?;

    tracing::info!(
        user_id = %user_id,
        business_id = %business.id,
        "Business profile created"
    );

    Ok(HttpResponse::Created().json(serde_json::json!({
        "business": BusinessResponse::from(&business),
        "message": "Business setup successful"
    })))
}

/// GET /business/me
pub async fn get_business(
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let business = business::find_by_user(pool.get_ref(), user_id)
        .await?
        .ok_or_else(|| {
            AppError::Database(DatabaseError::NotFound(
                "Business not found. Please complete business setup.".to_string(),
            ))
        })?;

    Ok(HttpResponse::Ok().json(BusinessResponse::from(&business)))
}

/// PUT /business/update
///
/// Partial update of the business profile.
///
/// # Errors
/// - 400: Field validation failures
/// - 404: No business profile to update
pub async fn update_business(
    form: web::Json<BusinessUpdateRequest>,
    pool: web::Data<PgPool>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let business_name = match form.business_name.as_deref() {
        Some(name) => Some(is_valid_business_name(name)?),
        None => None,
    };

    let currency = match form.currency.as_deref() {
        Some(currency) => Some(is_valid_currency(currency)?),
        None => None,
    };

    if business::find_by_user(pool.get_ref(), user_id).await?.is_none() {
        return Err(AppError::Database(DatabaseError::NotFound(
            "Business not found. Please complete business setup first.".to_string(),
        )));
    }

    let business = business::update(
        pool.get_ref(),
        user_id,
        business_name.as_deref(),
        currency.as_deref(),
        form.business_logo.as_deref(),
        form.business_type.as_deref(),
    )
    .await?;

    tracing::info!(user_id = %user_id, "Business profile updated");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "business": BusinessResponse::from(&business),
        "message": "Business updated successfully"
    })))
}
