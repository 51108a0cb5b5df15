use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub session: SessionSettings,
    pub email: EmailSettings,
    pub rate_limit: RateLimitSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,           // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,          // seconds (e.g., 86400 for 1 day)
    pub refresh_token_expiry_remember: i64, // seconds (e.g., 2592000 for 30 days)
    pub issuer: String,
}

/// Session inactivity settings
#[derive(serde::Deserialize, Clone)]
pub struct SessionSettings {
    pub inactivity_timeout_minutes: i64,
}

/// Outbound email settings
#[derive(serde::Deserialize, Clone)]
pub struct EmailSettings {
    pub base_url: String,
    pub sender: String,
    /// Base URL embedded in the verification / reset links sent to users
    pub frontend_url: String,
}

/// Request throttling settings
#[derive(serde::Deserialize, Clone)]
pub struct RateLimitSettings {
    /// Requests allowed per window on credential endpoints, keyed by IP
    pub credential_requests: u32,
    pub credential_window_seconds: u64,
    /// Verification resends allowed per window, keyed by user
    pub resend_requests: u32,
    pub resend_window_seconds: u64,
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .build()?;
    settings.try_deserialize::<Settings>()
}
