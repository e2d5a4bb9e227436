//! CLI command implementations.

pub mod admin;
pub mod config;
pub mod gateway;
pub mod secret;

pub use admin::run_admin;
pub use config::run_config;
pub use gateway::run_gateway;
pub use secret::run_secret;

use std::path::Path;

use trainportal_core::{Config, ConfigError};

/// Load configuration from `path`, or from the default location.
///
/// # Errors
///
/// Returns error if the file cannot be read, parsed or validated.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    }
}
