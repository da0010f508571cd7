//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,https://ai.rishinex.tech,https://rishinex.tech,https://apsa.py.rishinex.tech";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the Cloudinary upload API.
#[derive(Clone, Debug)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub folder: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub jwt_secret: String,
    pub log_level: Level,
    pub genai_base_url: String,
    pub genai_timeout: Duration,
    pub cloudinary: Option<CloudinaryConfig>,
    pub cors_origins: Vec<String>,
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub topic_model: String,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let mut bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;
        if let Ok(port) = std::env::var("PORT") {
            let port = port
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), e.to_string()))?;
            bind_address.set_port(port);
        }

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load AI Service Settings ---
        let genai_base_url = std::env::var("GENAI_API_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        let genai_timeout = Duration::from_secs(parse_or("GENAI_TIMEOUT_SECS", 30)?);

        // --- Load Object Storage Credentials (as optional) ---
        let cloudinary = match (
            std::env::var("CLOUDINARY_CLOUD_NAME").ok(),
            std::env::var("CLOUDINARY_API_KEY").ok(),
            std::env::var("CLOUDINARY_API_SECRET").ok(),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
                folder: std::env::var("CLOUDINARY_FOLDER")
                    .unwrap_or_else(|_| "study-assistant".to_string()),
            }),
            _ => None,
        };

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        // --- Load Topic Generation Settings ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let openai_base_url = std::env::var("OPENAI_BASE_URL").ok();
        let topic_model =
            std::env::var("TOPIC_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let max_upload_bytes = parse_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?;

        Ok(Self {
            bind_address,
            database_url,
            jwt_secret,
            log_level,
            genai_base_url,
            genai_timeout,
            cloudinary,
            cors_origins,
            openai_api_key,
            openai_base_url,
            topic_model,
            max_upload_bytes,
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))
}

fn parse_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
