//! Configuration for deskpilot.

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// Main configuration for the server.
#[derive(Debug, Clone)]
pub struct Config {
    pub google: GoogleConfig,
    pub gemini: GeminiConfig,
    pub server: ServerConfig,
    pub sheet: SheetConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            google: GoogleConfig::from_env()?,
            gemini: GeminiConfig::from_env()?,
            server: ServerConfig::from_env()?,
            sheet: SheetConfig::from_env()?,
        })
    }
}

/// Google OAuth and API configuration.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// Path to the installed-app client secrets JSON (downloaded from the
    /// Google Cloud console).
    pub credentials_path: PathBuf,
    /// Path to the cached token file (default: ~/.deskpilot/token.json).
    pub token_cache_path: PathBuf,
    /// If set, the id_token email claim must match this address or
    /// authentication aborts before any document operation runs.
    pub authorized_email: Option<String>,
    /// OAuth scopes requested during the browser flow.
    pub scopes: Vec<String>,
}

impl GoogleConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let credentials_path = optional_env("GOOGLE_CREDENTIALS_FILE")?
            .map(PathBuf::from)
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "GOOGLE_CREDENTIALS_FILE".to_string(),
                hint: "Point it at an OAuth client secrets JSON from the Google Cloud console."
                    .to_string(),
            })?;

        Ok(Self {
            credentials_path,
            token_cache_path: optional_env("GOOGLE_TOKEN_CACHE")?
                .map(PathBuf::from)
                .unwrap_or_else(default_token_cache_path),
            authorized_email: optional_env("AUTHORIZED_EMAIL")?,
            scopes: vec![
                // openid + email make Google return an id_token, which the
                // authorized-email gate needs to verify who logged in.
                "openid".to_string(),
                "email".to_string(),
                "https://www.googleapis.com/auth/drive".to_string(),
                "https://www.googleapis.com/auth/spreadsheets".to_string(),
                "https://www.googleapis.com/auth/presentations".to_string(),
            ],
        })
    }
}

/// Get the default token cache path (~/.deskpilot/token.json).
fn default_token_cache_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".deskpilot")
        .join("token.json")
}

/// Gemini text-generation configuration.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: Option<SecretString>,
    /// Model to use (default: gemini-1.5-flash).
    pub model: String,
    /// Base URL for the Generative Language API.
    pub base_url: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &self.api_key.is_some())
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: optional_env("GEMINI_API_KEY")?.map(SecretString::from),
            model: optional_env("GEMINI_MODEL")?.unwrap_or_else(|| "gemini-1.5-flash".to_string()),
            base_url: optional_env("GEMINI_BASE_URL")?
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
        })
    }

    /// Get the API key if configured.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_ref().map(|k| k.expose_secret())
    }
}

/// MCP server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: optional_env("MCP_HOST")?.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: optional_env("MCP_PORT")?
                .map(|s| s.parse())
                .transpose()
                .map_err(|e| ConfigError::InvalidValue {
                    key: "MCP_PORT".to_string(),
                    message: format!("must be a valid port number: {e}"),
                })?
                .unwrap_or(8000),
        })
    }
}

/// Spreadsheet layout configuration.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    /// Tab name all payroll operations target (default: Sheet1).
    pub tab: String,
}

impl SheetConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            tab: optional_env("SHEET_TAB")?.unwrap_or_else(|| "Sheet1".to_string()),
        })
    }
}

// Helper functions

fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}
