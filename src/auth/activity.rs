/// Session Activity Tracking
///
/// Records the last-activity timestamp per user and enforces the inactivity
/// timeout. A request arriving past the timeout tears down every refresh
/// token the user holds, not just the offending request.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::refresh_token;
use crate::error::{AppError, AuthError};

/// Set `last_activity` to now
///
/// Concurrent touches race benignly; last write wins.
pub async fn touch(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET last_activity = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Whether a session has sat idle past the timeout
///
/// A user with no recorded activity yet is never considered inactive.
pub fn is_inactive(last_activity: Option<DateTime<Utc>>, timeout_minutes: i64) -> bool {
    match last_activity {
        None => false,
        Some(last) => Utc::now() - last > Duration::minutes(timeout_minutes),
    }
}

/// Enforce the inactivity guard for one authenticated request
///
/// Runs before any business logic touches user state:
/// - an inactive account is rejected outright
/// - a session idle past the timeout invalidates ALL of the user's refresh
///   tokens and fails with `SessionExpired`
/// - otherwise the activity timestamp is advanced and the request proceeds
pub async fn enforce(pool: &PgPool, user_id: Uuid, timeout_minutes: i64) -> Result<(), AppError> {
    let row = sqlx::query_as::<_, (Option<DateTime<Utc>>, bool)>(
        "SELECT last_activity, is_active FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let (last_activity, is_active) = match row {
        Some(row) => row,
        None => return Err(AppError::Auth(AuthError::InvalidCredentials)),
    };

    if !is_active {
        return Err(AppError::Auth(AuthError::AccountDisabled));
    }

    if is_inactive(last_activity, timeout_minutes) {
        refresh_token::invalidate_all_for_user(pool, user_id).await?;

        tracing::info!(
            user_id = %user_id,
            "Session expired due to inactivity, all refresh tokens invalidated"
        );

        return Err(AppError::Auth(AuthError::SessionExpired));
    }

    touch(pool, user_id).await?;

    Ok(())
}
