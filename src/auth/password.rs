/// Password Hashing and Verification
///
/// Handles password hashing with bcrypt and password complexity validation.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

const SPECIAL_CHARACTERS: &str = r#"!@#$%^&*(),.?":{}|<>"#;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns error if:
/// - Password fails complexity validation
/// - Bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_complexity(password)?;

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// bcrypt performs the comparison in constant time.
///
/// # Errors
/// Returns error if verification fails
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

/// Validate password complexity requirements
///
/// Requirements:
/// - Minimum 8 characters
/// - Maximum 128 characters
/// - At least one uppercase letter
/// - At least one digit
/// - At least one special character
///
/// Each failure names the rule that was broken.
pub fn validate_password_complexity(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    // Check maximum length (bcrypt limitation and DoS prevention)
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::Validation(ValidationError::PasswordNoUppercase));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(ValidationError::PasswordNoDigit));
    }

    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        return Err(AppError::Validation(ValidationError::PasswordNoSpecial));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let password = "ValidPass123!";
        let hash = hash_password(password).expect("Failed to hash password");

        // Hash should not be the same as password
        assert_ne!(password, hash);
        // Hash should start with bcrypt identifier
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_verify_password() {
        let password = "ValidPass123!";
        let hash = hash_password(password).expect("Failed to hash password");

        let is_valid = verify_password(password, &hash).expect("Failed to verify password");
        assert!(is_valid);
    }

    #[test]
    fn test_verify_wrong_password() {
        let password = "ValidPass123!";
        let hash = hash_password(password).expect("Failed to hash password");

        let is_valid =
            verify_password("WrongPass123!", &hash).expect("Failed to verify password");
        assert!(!is_valid);
    }

    #[test]
    fn test_too_short_password() {
        let result = validate_password_complexity("Ab1!");
        match result {
            Err(AppError::Validation(ValidationError::TooShort(field, _))) => {
                assert_eq!(field, "password")
            }
            _ => panic!("Expected too-short validation error"),
        }
    }

    #[test]
    fn test_too_long_password() {
        let long_password = format!("A1!{}", "a".repeat(MAX_PASSWORD_LENGTH));
        assert!(validate_password_complexity(&long_password).is_err());
    }

    #[test]
    fn test_no_uppercase() {
        let result = validate_password_complexity("abcd123!");
        match result {
            Err(AppError::Validation(ValidationError::PasswordNoUppercase)) => (),
            _ => panic!("Expected missing-uppercase validation error"),
        }
    }

    #[test]
    fn test_no_digit() {
        let result = validate_password_complexity("Abcdefg!");
        match result {
            Err(AppError::Validation(ValidationError::PasswordNoDigit)) => (),
            _ => panic!("Expected missing-digit validation error"),
        }
    }

    #[test]
    fn test_no_special_character() {
        let result = validate_password_complexity("Abcd1234");
        match result {
            Err(AppError::Validation(ValidationError::PasswordNoSpecial)) => (),
            _ => panic!("Expected missing-special validation error"),
        }
    }

    #[test]
    fn test_valid_password() {
        assert!(validate_password_complexity("Abcd123!").is_ok());
        assert!(hash_password("Abcd123!").is_ok());
    }
}
