/// Credential Verification
///
/// Checks an email/password pair against the credential store. A missing
/// account and a wrong password produce the identical failure so callers
/// cannot probe which emails are registered.

use sqlx::PgPool;

use crate::auth::password::verify_password;
use crate::error::{AppError, AuthError};
use crate::users::{self, User};
use crate::validators::is_valid_email;

/// Authenticate a user by email and password
///
/// # Errors
/// - `InvalidCredentials` when the account is absent or the password is wrong
///   (bcrypt compares in constant time)
/// - `AccountDisabled` when credentials are right but the account is inactive
pub async fn authenticate(pool: &PgPool, email: &str, password: &str) -> Result<User, AppError> {
    let email = is_valid_email(email)?;

    let user = users::find_by_email(pool, &email)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    let password_valid = verify_password(password, &user.password_hash)?;
    if !password_valid {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    if !user.is_active {
        return Err(AppError::Auth(AuthError::AccountDisabled));
    }

    Ok(user)
}
