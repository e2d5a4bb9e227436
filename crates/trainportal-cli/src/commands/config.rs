//! Config inspection and initialization.

use std::path::Path;

use anyhow::Result;
use trainportal_auth::TokenIssuer;
use trainportal_core::Config;

use crate::commands::load_config;
use crate::ui;

/// Config actions.
#[derive(Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Validate the configuration.
    Validate,
    /// Print the config file location.
    Path,
    /// Write a starter config file.
    Init {
        /// Overwrite an existing file.
        force: bool,
    },
}

/// Run the config command.
pub fn run_config(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    let path = config_path.map_or_else(Config::default_path, Path::to_path_buf);

    match action {
        ConfigAction::Show => show_config(config_path),
        ConfigAction::Validate => validate_config(config_path, &path),
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigAction::Init { force } => init_config(&path, force),
    }
}

/// Show the effective configuration with the secret masked.
fn show_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let mut value = serde_json::to_value(&config)?;

    if let Some(secret) = value.pointer_mut("/auth/jwtSecret") {
        if !secret.is_null() {
            *secret = serde_json::Value::String("[REDACTED]".to_string());
        }
    }

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn validate_config(config_path: Option<&Path>, path: &Path) -> Result<()> {
    match load_config(config_path) {
        Ok(config) => {
            ui::success(&format!("Configuration is valid: {}", path.display()));
            if config.auth.jwt_secret.as_deref().is_none_or(str::is_empty) {
                ui::warning("No signing secret set; the gateway will refuse to start");
            }
            Ok(())
        }
        Err(e) => {
            ui::error(&format!("Configuration invalid: {e}"));
            Err(e.into())
        }
    }
}

/// Write defaults plus a freshly generated signing secret.
fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        ui::warning(&format!("Config already exists: {}", path.display()));
        ui::info("Use --force to overwrite");
        return Ok(());
    }

    let mut config = Config::default();
    config.auth.jwt_secret = Some(TokenIssuer::generate_hex_secret());
    config.save(path)?;

    ui::success(&format!("Wrote {}", path.display()));
    Ok(())
}
