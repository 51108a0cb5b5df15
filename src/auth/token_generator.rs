/// Opaque Token Generation
///
/// Produces the URL-safe random strings backing email verification and
/// password reset tokens. 32 random bytes give 256 bits of entropy;
/// uniqueness is still enforced by the store's unique constraint.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

/// Generate a cryptographically secure, URL-safe opaque token
///
/// 32 random bytes, base64url-encoded without padding (43 characters).
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_length() {
        // 32 bytes -> 43 base64url characters without padding
        assert_eq!(generate_token().len(), 43);
    }

    #[test]
    fn test_token_is_url_safe() {
        let token = generate_token();
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert!(!token.contains('='));
    }

    #[test]
    fn test_tokens_do_not_repeat() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
    }
}
