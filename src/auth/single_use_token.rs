/// Single-Use Token Store
///
/// One store backs both email verification and password reset tokens: same
/// shape, different purpose tag. A token is valid when it is unconsumed and
/// younger than the fixed 30-minute window. Consumption happens at most once;
/// the conditional update is the guard against concurrent double-use.
/// Records are kept after consumption as an audit trail.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::token_generator::generate_token;
use crate::error::{AppError, TokenError};

/// Validity window from creation, in minutes
pub const TOKEN_VALIDITY_MINUTES: i64 = 30;

/// The two purposes a single-use token can serve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EmailVerification,
    PasswordReset,
}

impl TokenKind {
    /// Purpose tag stored alongside the token
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::EmailVerification => "email_verification",
            TokenKind::PasswordReset => "password_reset",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SingleUseToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
    pub consumed: bool,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl SingleUseToken {
    /// Valid iff unconsumed and inside the 30-minute window
    pub fn is_valid(&self) -> bool {
        if self.consumed {
            return false;
        }
        Utc::now() < self.created_at + Duration::minutes(TOKEN_VALIDITY_MINUTES)
    }
}

/// Create and persist a fresh token for a user
///
/// Outstanding tokens for the same user are left alone; stale ones simply
/// age out of their window.
pub async fn issue(
    pool: &PgPool,
    user_id: Uuid,
    kind: TokenKind,
) -> Result<SingleUseToken, AppError> {
    let record = SingleUseToken {
        id: Uuid::new_v4(),
        user_id,
        token: generate_token(),
        purpose: kind.as_str().to_string(),
        created_at: Utc::now(),
        consumed: false,
        consumed_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO single_use_tokens (id, user_id, token, purpose, created_at, consumed)
        VALUES ($1, $2, $3, $4, $5, FALSE)
        "#,
    )
    .bind(record.id)
    .bind(record.user_id)
    .bind(&record.token)
    .bind(&record.purpose)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    tracing::info!(
        user_id = %user_id,
        purpose = kind.as_str(),
        "Single-use token issued"
    );

    Ok(record)
}

/// Look up a token by its opaque string and purpose
///
/// # Errors
/// `TokenError::NotFound` when no record matches; `TokenError::ExpiredOrConsumed`
/// when the record exists but is no longer valid. Callers surface both with a
/// single uniform message.
pub async fn validate(
    pool: &PgPool,
    token: &str,
    kind: TokenKind,
) -> Result<SingleUseToken, AppError> {
    let record = sqlx::query_as::<_, SingleUseToken>(
        r#"
        SELECT id, user_id, token, purpose, created_at, consumed, consumed_at
        FROM single_use_tokens
        WHERE token = $1 AND purpose = $2
        "#,
    )
    .bind(token)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Token(TokenError::NotFound))?;

    if !record.is_valid() {
        return Err(AppError::Token(TokenError::ExpiredOrConsumed));
    }

    Ok(record)
}

/// Mark a token consumed, exactly once
///
/// The update is conditional on `consumed = FALSE`; of N concurrent
/// consumers only one observes an affected row, the rest fail. A consumed
/// token is never re-validated even when a downstream step fails afterwards.
pub async fn consume(pool: &PgPool, token: &str) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE single_use_tokens
        SET consumed = TRUE, consumed_at = $1
        WHERE token = $2 AND consumed = FALSE
        "#,
    )
    .bind(Utc::now())
    .bind(token)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::Token(TokenError::ExpiredOrConsumed));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_record(created_at: DateTime<Utc>, consumed: bool) -> SingleUseToken {
        SingleUseToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token: generate_token(),
            purpose: TokenKind::EmailVerification.as_str().to_string(),
            created_at,
            consumed,
            consumed_at: if consumed { Some(Utc::now()) } else { None },
        }
    }

    #[test]
    fn test_purpose_tags() {
        assert_eq!(TokenKind::EmailVerification.as_str(), "email_verification");
        assert_eq!(TokenKind::PasswordReset.as_str(), "password_reset");
    }

    #[test]
    fn test_fresh_token_is_valid() {
        let record = token_record(Utc::now(), false);
        assert!(record.is_valid());
    }

    #[test]
    fn test_consumed_token_is_invalid() {
        let record = token_record(Utc::now(), true);
        assert!(!record.is_valid());
    }

    #[test]
    fn test_token_expires_after_window() {
        let created = Utc::now() - Duration::minutes(TOKEN_VALIDITY_MINUTES + 1);
        let record = token_record(created, false);
        assert!(!record.is_valid());
    }

    #[test]
    fn test_token_valid_just_inside_window() {
        let created = Utc::now() - Duration::minutes(TOKEN_VALIDITY_MINUTES - 1);
        let record = token_record(created, false);
        assert!(record.is_valid());
    }
}
