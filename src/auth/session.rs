/// Access/Refresh Token Issuer
///
/// Pairs short-lived stateless access tokens with ledger-backed refresh
/// tokens. Refreshing mints a new access token only; the refresh record is
/// reused until its own expiry or revocation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::auth::activity;
use crate::auth::jwt::generate_access_token;
use crate::auth::refresh_token;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::users::{self, User};

/// Token pair produced at login/refresh time
#[derive(Debug)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Issue a fresh session for an authenticated user
///
/// The refresh lifetime depends on the remember-me choice; the access token
/// lifetime is always the short configured window.
pub async fn issue_session(
    pool: &PgPool,
    user: &User,
    remember_me: bool,
    config: &JwtSettings,
) -> Result<SessionTokens, AppError> {
    let access_token = generate_access_token(&user.id, &user.email, config)?;
    let (refresh_token, refresh_expires_at) =
        refresh_token::issue(pool, user.id, remember_me, config).await?;

    Ok(SessionTokens {
        access_token,
        refresh_token,
        refresh_expires_at,
    })
}

/// Mint a new access token from a refresh token
///
/// Validates against the ledger, loads the owning user, and touches activity.
/// Every failure collapses into the uniform invalid-token error.
pub async fn refresh_access_token(
    pool: &PgPool,
    refresh_token_str: &str,
    config: &JwtSettings,
) -> Result<(String, User), AppError> {
    let record = refresh_token::validate(pool, refresh_token_str).await?;

    let user = users::find_by_id(pool, record.user_id)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidRefreshToken))?;

    if !user.is_active {
        return Err(AppError::Auth(AuthError::InvalidRefreshToken));
    }

    let access_token = generate_access_token(&user.id, &user.email, config)?;

    activity::touch(pool, user.id).await?;

    Ok((access_token, user))
}
