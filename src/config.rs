use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 5000;
const CONFIG_DIR: &str = "config";
const DEFAULT_UPLOADS_DIR: &str = "uploads";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEV_DEFAULT_JWT_SECRET: &str = "development_only_jwt_secret_for_local_storefront_runs";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key
    #[validate(length(min = 32), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// JWT expiration time in seconds
    #[validate(range(min = 300, max = 2_592_000))]
    pub jwt_expiration: usize,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// JWT issuer name
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Honour `isAdmin` on self-registration
    #[serde(default)]
    pub allow_admin_registration: bool,

    /// Directory holding uploaded product images
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,

    /// Maximum multipart body size in bytes
    #[serde(default = "default_max_upload_bytes")]
    #[validate(range(min = 1024))]
    pub max_upload_bytes: usize,

    /// Request timeout for HTTP handlers (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Stripe secret key; card payments are disabled when unset
    #[serde(default)]
    pub stripe_secret_key: Option<String>,

    /// Stripe API base URL
    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,

    /// Timeout for payment gateway calls (seconds)
    #[serde(default = "default_payment_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub payment_timeout_secs: u64,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the essentials
    pub fn new(
        database_url: String,
        jwt_secret: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration: 86_400,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            allow_admin_registration: false,
            uploads_dir: default_uploads_dir(),
            max_upload_bytes: default_max_upload_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
            stripe_secret_key: None,
            stripe_api_base: default_stripe_api_base(),
            payment_timeout_secs: default_payment_timeout_secs(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    pub fn uploads_path(&self) -> PathBuf {
        PathBuf::from(&self.uploads_dir)
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }

    /// Secret key for the card gateway, ignoring blank values
    pub fn stripe_key(&self) -> Option<&str> {
        self.stripe_secret_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_db_idle_timeout_secs() -> u64 {
    600
}

fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_auth_issuer() -> String {
    "signage-storefront".to_string()
}

fn default_auth_audience() -> String {
    "signage-storefront-admin".to_string()
}

fn default_uploads_dir() -> String {
    DEFAULT_UPLOADS_DIR.to_string()
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_stripe_api_base() -> String {
    DEFAULT_STRIPE_API_BASE.to_string()
}

fn default_payment_timeout_secs() -> u64 {
    30
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    let lower = trimmed.to_ascii_lowercase();
    if ["changeme", "your-secret-key", "password"]
        .iter()
        .any(|pattern| lower.contains(pattern))
    {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be overridden with a secure random value".into());
        return Err(err);
    }

    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("signage_storefront={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let mut builder = Config::builder()
        .set_default("database_url", "sqlite://storefront.db?mode=rwc")?
        .set_default("jwt_expiration", 86_400)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 5000)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false));

    // The development secret is only offered when nothing else is configured
    if run_env.eq_ignore_ascii_case(DEFAULT_ENV) {
        builder = builder.set_default("jwt_secret", DEV_DEFAULT_JWT_SECRET)?;
    }

    let config = builder
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to a random string of at least 32 characters.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_config_defaults() {
        let cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "a_storefront_test_secret_with_enough_entropy_42".into(),
            "127.0.0.1".into(),
            5000,
            "development".into(),
        );
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.payment_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.uploads_path(), PathBuf::from("uploads"));
        assert!(cfg.stripe_key().is_none());
    }

    #[test]
    fn blank_stripe_key_counts_as_unset() {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "a_storefront_test_secret_with_enough_entropy_42".into(),
            "127.0.0.1".into(),
            5000,
            "development".into(),
        );
        cfg.stripe_secret_key = Some("   ".into());
        assert!(cfg.stripe_key().is_none());
        cfg.stripe_secret_key = Some("sk_test_123".into());
        assert_eq!(cfg.stripe_key(), Some("sk_test_123"));
    }

    #[test]
    fn weak_jwt_secrets_rejected() {
        assert!(validate_jwt_secret(&"a".repeat(40)).is_err());
        assert!(validate_jwt_secret("my-password-is-very-long-and-definitely-secure").is_err());
        assert!(validate_jwt_secret("k3J9vQ2mX8pL5nR7tW1yZ4bC6dF0gH2j").is_ok());
    }
}
