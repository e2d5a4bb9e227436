//! # Training Portal Core
//!
//! Process-wide configuration for the training portal.
//!
//! This crate provides:
//! - Configuration loading and validation (JSON5 format)
//! - Environment overrides applied once at startup
//! - A redacting wrapper for the token signing secret

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod secrets;

pub use config::{
    AuthConfig, AuthConfigBuilder, Config, ConfigError, LogFormat, LoggingConfig,
    PasswordHashConfig, ServerConfig, StorageConfig,
};
pub use secrets::SigningSecret;
