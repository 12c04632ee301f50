//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local use.

use std::env;
use std::path::PathBuf;

pub const DEFAULT_AUTH_URL: &str = "https://www.strava.com/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://www.strava.com/oauth/token";
pub const DEFAULT_API_BASE_URL: &str = "https://www.strava.com/api/v3";
pub const DEFAULT_SCOPE: &str = "read_all,activity:read_all,activity:write,profile:read_all";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/auth/callback";

/// Application configuration, loaded once at startup.
#[derive(Clone)]
pub struct Config {
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Where Strava sends the user back after consent
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_base_url: String,
    /// Comma-separated OAuth scopes
    pub scope: String,
    /// Local server port
    pub port: u16,
    /// Path of the JSON key-value file holding tokens and timestamps
    pub store_path: PathBuf,
    /// Whether "import new activities" actually fetches.
    /// Off by default: the action only reports that import is unavailable.
    pub import_enabled: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("strava_client_id", &self.strava_client_id)
            .field("strava_client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("scope", &self.scope)
            .field("port", &self.port)
            .field("store_path", &self.store_path)
            .field("import_enabled", &self.import_enabled)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            strava_client_id: env::var("STRAVA_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_ID"))?,
            strava_client_secret: env::var("STRAVA_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("STRAVA_CLIENT_SECRET"))?,
            redirect_uri: env::var("STRAVA_REDIRECT_URI")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string()),
            auth_url: env::var("STRAVA_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string()),
            token_url: env::var("STRAVA_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_TOKEN_URL.to_string()),
            api_base_url: env::var("STRAVA_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            scope: env::var("STRAVA_SCOPE").unwrap_or_else(|_| DEFAULT_SCOPE.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT"))?,
            store_path: env::var("STORE_PATH")
                .unwrap_or_else(|_| "strava_namer_store.json".to_string())
                .into(),
            import_enabled: parse_flag(env::var("IMPORT_ENABLED").ok().as_deref())
                .ok_or(ConfigError::Invalid("IMPORT_ENABLED"))?,
        })
    }

    /// Config for tests. Network URLs point at an unroutable local port.
    pub fn test_default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: "http://127.0.0.1:9/oauth/token".to_string(),
            api_base_url: "http://127.0.0.1:9/api/v3".to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            port: 3000,
            store_path: "test_store.json".into(),
            import_enabled: false,
        }
    }
}

/// Parse a boolean flag; unset means false.
fn parse_flag(value: Option<&str>) -> Option<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        None => Some(false),
        Some(v) => match v.as_str() {
            "" | "0" | "false" | "no" | "off" => Some(false),
            "1" | "true" | "yes" | "on" => Some(true),
            _ => None,
        },
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
