/// Refresh Token Ledger
///
/// Handles issuance, validation, and revocation of session refresh tokens.
/// Refresh tokens are:
/// - Signed JWTs with a remember-me-dependent lifetime
/// - Stored verbatim in the ledger and looked up by exact string
/// - Reusable across access-token renewals until expiry or revocation
/// - Revocable individually (logout) or in bulk per user (credential changes,
///   forced inactivity expiry)

use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::claims::RefreshClaims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub invalidated: bool,
    pub invalidated_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Valid iff not revoked and not past its explicit expiry
    pub fn is_valid(&self) -> bool {
        !self.invalidated && Utc::now() < self.expires_at
    }
}

/// Ledger lifetime for a new record, in seconds
pub fn refresh_lifetime_seconds(config: &JwtSettings, remember_me: bool) -> i64 {
    if remember_me {
        config.refresh_token_expiry_remember
    } else {
        config.refresh_token_expiry
    }
}

/// Mint a signed refresh token and persist its ledger record
///
/// Returns the token string (what the client stores in the cookie) and the
/// ledger expiry, which matches the `exp` claim inside the token.
pub async fn issue(
    pool: &PgPool,
    user_id: Uuid,
    remember_me: bool,
    config: &JwtSettings,
) -> Result<(String, DateTime<Utc>), AppError> {
    let lifetime = refresh_lifetime_seconds(config, remember_me);
    let claims = RefreshClaims::new(user_id, lifetime, config.issuer.clone());

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Refresh token generation failed: {}", e)))?;

    let expires_at = DateTime::<Utc>::from_timestamp(claims.exp, 0)
        .ok_or_else(|| AppError::Internal("Refresh token expiry out of range".to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, token, created_at, expires_at, invalidated)
        VALUES ($1, $2, $3, $4, $5, FALSE)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&token)
    .bind(Utc::now())
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok((token, expires_at))
}

/// Validate a refresh token against the ledger
///
/// Not-found, expired and revoked all collapse into one uniform failure so
/// callers cannot distinguish the sub-reason.
pub async fn validate(pool: &PgPool, token: &str) -> Result<RefreshTokenRecord, AppError> {
    let record = sqlx::query_as::<_, RefreshTokenRecord>(
        r#"
        SELECT id, user_id, token, created_at, expires_at, invalidated, invalidated_at
        FROM refresh_tokens
        WHERE token = $1
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    match record {
        None => {
            tracing::warn!("Refresh token not found in ledger");
            Err(AppError::Auth(AuthError::InvalidRefreshToken))
        }
        Some(record) => {
            if record.invalidated {
                tracing::warn!(user_id = %record.user_id, "Attempt to use revoked refresh token");
                return Err(AppError::Auth(AuthError::InvalidRefreshToken));
            }

            if record.expires_at <= Utc::now() {
                tracing::info!(user_id = %record.user_id, "Refresh token expired");
                return Err(AppError::Auth(AuthError::InvalidRefreshToken));
            }

            Ok(record)
        }
    }
}

/// Revoke a single refresh token (logout)
///
/// Revoking an already-revoked or unknown token is a no-op.
pub async fn invalidate(pool: &PgPool, token: &str) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET invalidated = TRUE, invalidated_at = $1
        WHERE token = $2 AND invalidated = FALSE
        "#,
    )
    .bind(Utc::now())
    .bind(token)
    .execute(pool)
    .await?;

    Ok(())
}

/// Revoke every currently-valid refresh token for a user
///
/// This is the privilege-escalation guard: password change, password reset
/// completion and forced inactivity expiry all route through here. Other
/// users' records are untouched.
pub async fn invalidate_all_for_user(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET invalidated = TRUE, invalidated_at = $1
        WHERE user_id = $2 AND invalidated = FALSE
        "#,
    )
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user_id, "All refresh tokens invalidated for user");
    Ok(())
}
