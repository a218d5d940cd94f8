//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. A `.env` file is honoured for local
//! development.

use std::env;
use std::time::Duration;

/// Default per-request deadline for every remote call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Deep link the sign-up confirmation email redirects to.
pub const DEFAULT_EMAIL_REDIRECT_URL: &str = "com.bloodbank://sign-in";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Supabase project URL (e.g. `https://xyz.supabase.co`)
    pub supabase_url: String,
    /// Supabase anonymous API key (public)
    pub supabase_anon_key: String,
    /// Mapbox access token for tilequery requests
    pub mapbox_access_token: String,
    /// Redirect target embedded in sign-up confirmation emails
    pub email_redirect_url: String,
    /// Deadline applied to every HTTP request
    pub request_timeout: Duration,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            mapbox_access_token: "test_mapbox_token".to_string(),
            email_redirect_url: DEFAULT_EMAIL_REDIRECT_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let request_timeout = match env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    var: "REQUEST_TIMEOUT_SECS",
                    reason: format!("expected whole seconds, got {:?}", raw),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        var: "REQUEST_TIMEOUT_SECS",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            supabase_url: env::var("SUPABASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            mapbox_access_token: env::var("MAPBOX_ACCESS_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MAPBOX_ACCESS_TOKEN"))?,
            email_redirect_url: env::var("EMAIL_REDIRECT_URL")
                .unwrap_or_else(|_| DEFAULT_EMAIL_REDIRECT_URL.to_string()),
            request_timeout,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
