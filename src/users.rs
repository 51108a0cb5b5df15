/// Credential Store
///
/// User records and the queries the authentication core runs against them.
/// Email is the sole login identifier and is stored lower-cased.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

const USER_COLUMNS: &str = "id, email, username, password_hash, email_verified, \
     email_verified_at, last_activity, remember_me, is_active, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,
    pub email_verified: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub remember_me: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User payload returned to clients (password hash never leaves the store)
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub email_verified: bool,
    pub email_verified_at: Option<String>,
    pub has_business: bool,
}

impl UserResponse {
    pub fn new(user: &User, has_business: bool) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            username: user.username.clone(),
            email_verified: user.email_verified,
            email_verified_at: user.email_verified_at.map(|t| t.to_rfc3339()),
            has_business,
        }
    }
}

/// Look up a user by normalized email
pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE email = $1",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Look up a user by id
pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Create a user record with an unverified email
pub async fn create_user(pool: &PgPool, email: &str, password_hash: &str) -> Result<User, AppError> {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        email: email.to_string(),
        username: None,
        password_hash: password_hash.to_string(),
        email_verified: false,
        email_verified_at: None,
        last_activity: None,
        remember_me: false,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO users
        (id, email, password_hash, email_verified, remember_me, is_active, created_at, updated_at)
        VALUES ($1, $2, $3, FALSE, FALSE, TRUE, $4, $5)
        "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(pool)
    .await?;

    Ok(user)
}

/// Whether any account exists for the given normalized email
pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, AppError> {
    let count = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await?;

    Ok(count.0 > 0)
}

/// Whether another account already uses the given email
pub async fn email_taken_by_other(
    pool: &PgPool,
    email: &str,
    user_id: Uuid,
) -> Result<bool, AppError> {
    let count =
        sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users WHERE email = $1 AND id != $2")
            .bind(email)
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    Ok(count.0 > 0)
}

/// Replace the stored password hash
pub async fn set_password_hash(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Flip `email_verified` false -> true
///
/// Conditional on the flag still being false, so the timestamp records the
/// first verification only.
pub async fn mark_email_verified(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE users
        SET email_verified = TRUE, email_verified_at = $1, updated_at = $1
        WHERE id = $2 AND email_verified = FALSE
        "#,
    )
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record the remember-me choice made at login
pub async fn set_remember_me(pool: &PgPool, user_id: Uuid, remember_me: bool) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET remember_me = $1, updated_at = $2 WHERE id = $3")
        .bind(remember_me)
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Apply a partial profile update and return the fresh record
pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<User, AppError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users
        SET username = COALESCE($1, username),
            email = COALESCE($2, email),
            updated_at = $3
        WHERE id = $4
        RETURNING {}
        "#,
        USER_COLUMNS
    ))
    .bind(username)
    .bind(email)
    .bind(Utc::now())
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(user)
}
