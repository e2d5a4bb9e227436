//! Configuration loading and validation.
//!
//! Config location: `~/.trainportal/trainportal.json` (JSON5).
//! The configuration is loaded once at startup and treated as immutable
//! afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::secrets::SigningSecret;

/// Default token validity in hours.
const DEFAULT_TOKEN_VALIDITY_HOURS: u64 = 72;
/// Longest accepted token validity (one year).
pub const MAX_TOKEN_VALIDITY_HOURS: u64 = 24 * 365;
/// Argon2 defaults (19 MiB, 2 passes, 1 lane).
const DEFAULT_HASH_MEMORY_KIB: u32 = 19 * 1024;
const DEFAULT_HASH_ITERATIONS: u32 = 2;
const DEFAULT_HASH_PARALLELISM: u32 = 1;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON5 parsing error.
    #[error("Parse error: {0}")]
    Parse(#[from] json5::Error),

    /// Config validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Credential storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location, with env overrides.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns error if config cannot be loaded, parsed or validated.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific path, with env overrides.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_file(path)?.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = json5::from_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to a path.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file write fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Self::state_dir().join("trainportal.json")
    }

    /// Get the state directory.
    ///
    /// Uses `TRAINPORTAL_STATE_DIR` env var if set, otherwise `~/.trainportal`.
    #[must_use]
    pub fn state_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("TRAINPORTAL_STATE_DIR") {
            PathBuf::from(dir)
        } else if let Some(home) = dirs::home_dir() {
            home.join(".trainportal")
        } else {
            PathBuf::from(".trainportal")
        }
    }

    /// Directory holding the credential store.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(|| Self::state_dir().join("data"))
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// `TRAINPORTAL_JWT_SECRET` takes precedence over the legacy `JWT_SECRET`.
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("TRAINPORTAL_JWT_SECRET")
            .filter(|s| !s.is_empty())
            .or_else(|| lookup("JWT_SECRET").filter(|s| !s.is_empty()));
        if let Some(secret) = secret {
            self.auth.jwt_secret = Some(secret);
        }

        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT override"),
            }
        }

        if let Some(format) = lookup("TRAINPORTAL_LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "json" => self.logging.format = LogFormat::Json,
                "pretty" => self.logging.format = LogFormat::Pretty,
                other => tracing::warn!(value = %other, "Ignoring unknown log format override"),
            }
        }

        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.server.login_attempts_per_minute == 0 {
            return Err(ConfigError::Validation(
                "loginAttemptsPerMinute must be at least 1".to_string(),
            ));
        }

        if self.auth.token_validity_hours == 0 {
            return Err(ConfigError::Validation(
                "tokenValidityHours must be at least 1".to_string(),
            ));
        }

        if self.auth.token_validity_hours > MAX_TOKEN_VALIDITY_HOURS {
            return Err(ConfigError::Validation(format!(
                "tokenValidityHours must be at most {MAX_TOKEN_VALIDITY_HOURS}"
            )));
        }

        let hash = &self.auth.password_hash;
        if hash.memory_kib == 0 || hash.iterations == 0 || hash.parallelism == 0 {
            return Err(ConfigError::Validation(
                "passwordHash parameters must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Enable CORS.
    #[serde(default = "default_true")]
    pub cors: bool,

    /// Login attempts allowed per email per minute.
    #[serde(default = "default_login_attempts")]
    pub login_attempts_per_minute: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            cors: true,
            login_attempts_per_minute: default_login_attempts(),
        }
    }
}

const fn default_port() -> u16 {
    3000
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_login_attempts() -> u32 {
    10
}

/// Authentication configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Token signing secret. Required; there is no built-in default.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Token validity window in hours.
    #[serde(default = "default_token_validity")]
    pub token_validity_hours: u64,

    /// Password hashing cost.
    #[serde(default)]
    pub password_hash: PasswordHashConfig,
}

fn default_token_validity() -> u64 {
    DEFAULT_TOKEN_VALIDITY_HOURS
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_validity_hours: default_token_validity(),
            password_hash: PasswordHashConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Create a new auth config builder.
    #[must_use]
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Get the token validity window as a Duration.
    ///
    /// Saturates instead of overflowing; the token issuer rejects windows it
    /// cannot represent.
    #[must_use]
    pub fn token_validity(&self) -> Duration {
        Duration::from_secs(self.token_validity_hours.saturating_mul(3600))
    }

    /// The configured signing secret, if any.
    #[must_use]
    pub fn signing_secret(&self) -> Option<SigningSecret> {
        self.jwt_secret.clone().map(SigningSecret::new)
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "jwt_secret",
                &self.jwt_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_validity_hours", &self.token_validity_hours)
            .field("password_hash", &self.password_hash)
            .finish()
    }
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordHashConfig {
    /// Memory cost in KiB.
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    /// Number of passes.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    /// Degree of parallelism.
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

const fn default_memory_kib() -> u32 {
    DEFAULT_HASH_MEMORY_KIB
}

const fn default_iterations() -> u32 {
    DEFAULT_HASH_ITERATIONS
}

const fn default_parallelism() -> u32 {
    DEFAULT_HASH_PARALLELISM
}

impl Default for PasswordHashConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

/// Builder for `AuthConfig`.
#[derive(Debug, Default)]
pub struct AuthConfigBuilder {
    config: AuthConfig,
}

impl AuthConfigBuilder {
    /// Set the JWT secret.
    #[must_use]
    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = Some(secret.into());
        self
    }

    /// Set token validity in hours.
    #[must_use]
    pub fn token_validity_hours(mut self, hours: u64) -> Self {
        self.config.token_validity_hours = hours;
        self
    }

    /// Set the password hashing cost.
    #[must_use]
    pub fn password_hash(mut self, cost: PasswordHashConfig) -> Self {
        self.config.password_hash = cost;
        self
    }

    /// Build the config.
    #[must_use]
    pub fn build(self) -> AuthConfig {
        self.config
    }
}

/// Credential storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Data directory override.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}
