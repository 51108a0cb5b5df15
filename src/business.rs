/// Business Profile Store
///
/// Each user owns at most one business profile. Presence is always an
/// explicit optional lookup, never an exception-driven existence check.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

const BUSINESS_COLUMNS: &str =
    "id, user_id, business_name, currency, business_logo, business_type, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Business {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub currency: String,
    pub business_logo: Option<String>,
    pub business_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Business payload returned to clients
#[derive(Debug, Serialize)]
pub struct BusinessResponse {
    pub id: String,
    pub business_name: String,
    pub currency: String,
    pub business_logo: Option<String>,
    pub business_type: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Business> for BusinessResponse {
    fn from(business: &Business) -> Self {
        Self {
            id: business.id.to_string(),
            business_name: business.business_name.clone(),
            currency: business.currency.clone(),
            business_logo: business.business_logo.clone(),
            business_type: business.business_type.clone(),
            created_at: business.created_at.to_rfc3339(),
            updated_at: business.updated_at.to_rfc3339(),
        }
    }
}

/// Look up the business attached to a user, if any
pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Business>, AppError> {
    let business = sqlx::query_as::<_, Business>(&format!(
        "SELECT {} FROM businesses WHERE user_id = $1",
        BUSINESS_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(business)
}

/// Create the business profile for a user
pub async fn create(
    pool: &PgPool,
    user_id: Uuid,
    business_name: &str,
    currency: &str,
    business_logo: Option<&str>,
) -> Result<Business, AppError> {
    let now = Utc::now();
    let business = Business {
        id: Uuid::new_v4(),
        user_id,
        business_name: business_name.to_string(),
        currency: currency.to_string(),
        business_logo: business_logo.map(|l| l.to_string()),
        business_type: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO businesses
        (id, user_id, business_name, currency, business_logo, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(business.id)
    .bind(business.user_id)
    .bind(&business.business_name)
    .bind(&business.currency)
    .bind(&business.business_logo)
    .bind(business.created_at)
    .bind(business.updated_at)
    .execute(pool)
    .await?;

    Ok(business)
}

/// Apply a partial update and return the fresh record
pub async fn update(
    pool: &PgPool,
    user_id: Uuid,
    business_name: Option<&str>,
    currency: Option<&str>,
    business_logo: Option<&str>,
    business_type: Option<&str>,
) -> Result<Business, AppError> {
    let business = sqlx::query_as::<_, Business>(&format!(
        r#"
        UPDATE businesses
        SET business_name = COALESCE($1, business_name),
            currency = COALESCE($2, currency),
            business_logo = COALESCE($3, business_logo),
            business_type = COALESCE($4, business_type),
            updated_at = $5
        WHERE user_id = $6
        RETURNING {}
        "#,
        BUSINESS_COLUMNS
    ))
    .bind(business_name)
    .bind(currency)
    .bind(business_logo)
    .bind(business_type)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(business)
}
