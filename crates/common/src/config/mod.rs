//! Configuration management for TenderDesk services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config.toml, config.yaml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Scoring model configuration
    #[serde(default)]
    pub prediction: PredictionConfig,

    /// Document text extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Startup seeding
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Largest accepted upload body in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Directory uploaded documents are written to
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,

    /// Allowed CORS origins; empty allows any
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token signing
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Credential lifetime in seconds
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Registrations allowed per caller address per minute
    #[serde(default = "default_register_per_minute")]
    pub register_per_minute: u32,

    /// Login attempts allowed per caller address per minute
    #[serde(default = "default_login_per_minute")]
    pub login_per_minute: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PredictionConfig {
    /// Directory holding the persisted scoring model
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ExtractionConfig {
    /// OCR command for image documents, invoked as `<cmd> <file> stdout`
    pub ocr_command: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (debug, info, warn, error, or EnvFilter syntax)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    /// Create the demo account on startup if it is missing
    #[serde(default = "default_enabled")]
    pub demo_user: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_request_timeout() -> u64 { 30 }
fn default_max_upload_bytes() -> usize { 16 * 1024 * 1024 }
fn default_upload_dir() -> PathBuf { PathBuf::from("uploads") }
fn default_cors_origins() -> Vec<String> { vec!["http://localhost:3000".to_string()] }
fn default_database_url() -> String { "sqlite://tender_management.db?mode=rwc".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_jwt_secret() -> String { DEV_JWT_SECRET.to_string() }
fn default_token_ttl() -> u64 { 30 * 24 * 60 * 60 }
fn default_register_per_minute() -> u32 { 5 }
fn default_login_per_minute() -> u32 { 10 }
fn default_model_dir() -> PathBuf { PathBuf::from("models") }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_enabled() -> bool { true }

/// Signing secret used when none is configured
pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            max_upload_bytes: default_max_upload_bytes(),
            upload_dir: default_upload_dir(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_secs: default_token_ttl(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            register_per_minute: default_register_per_minute(),
            login_per_minute: default_login_per_minute(),
            enabled: default_enabled(),
        }
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            demo_user: default_enabled(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Whether the signing secret is still the built-in development value
    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            prediction: PredictionConfig::default(),
            extraction: ExtractionConfig::default(),
            observability: ObservabilityConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}
