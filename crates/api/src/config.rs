//! Application configuration

use std::env;

/// One year; longer lifetimes overflow session expiry arithmetic
pub const MAX_SESSION_TTL_HOURS: i64 = 8760;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_address: String,
    pub cors_allowed_origins: Vec<String>,

    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Admin sessions
    pub session_cookie_name: String,
    pub session_ttl_hours: i64,
    pub session_cookie_secure: bool,

    // Bootstrap admin account (created at startup when both are set)
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,

    // Realtime relay
    pub auto_response_delay_ms: u64,
    pub relay_require_admin_session: bool,

    // Logging
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Server
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),

            // Database
            database_url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            // Admin sessions
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .ok()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "livechat_session".to_string()),
            session_ttl_hours: {
                let hours: i64 = env::var("SESSION_TTL_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()
                    .map_err(|_| ConfigError::Invalid("SESSION_TTL_HOURS must be a number"))?;
                if !(1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
                    return Err(ConfigError::Invalid(
                        "SESSION_TTL_HOURS must be between 1 and 8760",
                    ));
                }
                hours
            },
            session_cookie_secure: env::var("SESSION_COOKIE_SECURE")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),

            // Bootstrap admin
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|e| !e.trim().is_empty()),
            admin_password: {
                let password = env::var("ADMIN_PASSWORD").ok().filter(|p| !p.is_empty());
                if let Some(ref p) = password {
                    if p.len() < 12 {
                        return Err(ConfigError::WeakSecret(
                            "ADMIN_PASSWORD must be at least 12 characters",
                        ));
                    }
                }
                password
            },

            // Realtime relay
            auto_response_delay_ms: env::var("AUTO_RESPONSE_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            relay_require_admin_session: env::var("RELAY_REQUIRE_ADMIN_SESSION")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),

            // Logging
            log_json: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Weak secret: {0}")]
    WeakSecret(&'static str),
}
