mod auth;
mod business;
mod health_check;
mod password_reset;
mod profile;
mod verification;

pub use auth::{change_password, login, logout, refresh, signup, REFRESH_TOKEN_COOKIE};
pub use business::{get_business, setup_business, update_business};
pub use health_check::health_check;
pub use password_reset::{password_reset, password_reset_request};
pub use profile::{get_user_profile, update_profile};
pub use verification::{resend_verification_email, verify_email};
