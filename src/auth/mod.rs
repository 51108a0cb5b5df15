/// Authentication module
///
/// The authentication/session core: credential verification, access and
/// refresh token issuance, single-use token lifecycle, and session activity
/// tracking.

mod activity;
mod claims;
mod credentials;
mod jwt;
mod password;
mod refresh_token;
mod session;
mod single_use_token;
mod token_generator;

pub use activity::{enforce as enforce_activity, is_inactive, touch as touch_activity};
pub use claims::{Claims, RefreshClaims};
pub use credentials::authenticate;
pub use jwt::{generate_access_token, validate_access_token};
pub use password::{hash_password, validate_password_complexity, verify_password};
pub use refresh_token::{
    invalidate as invalidate_refresh_token, invalidate_all_for_user,
    issue as issue_refresh_token, refresh_lifetime_seconds,
    validate as validate_refresh_token, RefreshTokenRecord,
};
pub use session::{issue_session, refresh_access_token, SessionTokens};
pub use single_use_token::{
    consume as consume_token, issue as issue_token, validate as validate_token, SingleUseToken,
    TokenKind, TOKEN_VALIDITY_MINUTES,
};
pub use token_generator::generate_token;
