//! Gateway command - start and probe the gateway server.

use std::path::Path;

use anyhow::Result;
use trainportal_gateway::GatewayConfig;

use crate::commands::load_config;
use crate::ui;

/// Gateway actions.
#[derive(Debug, Clone)]
pub enum GatewayAction {
    /// Start the server.
    Run {
        /// Port override.
        port: Option<u16>,
        /// Bind address override.
        bind: Option<String>,
    },
    /// Probe a running server.
    Status,
}

/// Run the gateway command.
pub async fn run_gateway(action: GatewayAction, config_path: Option<&Path>) -> Result<()> {
    match action {
        GatewayAction::Run { port, bind } => run_gateway_server(config_path, port, bind).await,
        GatewayAction::Status => gateway_status(config_path).await,
    }
}

async fn run_gateway_server(
    config_path: Option<&Path>,
    port: Option<u16>,
    bind: Option<String>,
) -> Result<()> {
    let config = load_config(config_path)?;

    let mut gateway_config = GatewayConfig::from_config(&config);
    if let Some(port) = port {
        gateway_config.port = port;
    }
    if let Some(bind) = bind {
        gateway_config.bind_address = bind;
    }

    if gateway_config.auth.jwt_secret.as_deref().is_none_or(str::is_empty) {
        ui::error("No token signing secret configured");
        ui::info("Run 'trainportal secret generate' and set TRAINPORTAL_JWT_SECRET");
        anyhow::bail!("missing signing secret");
    }

    ui::header("Starting Training Portal Gateway");
    ui::kv(
        "Address",
        &format!("{}:{}", gateway_config.bind_address, gateway_config.port),
    );
    ui::kv("Data", &gateway_config.data_dir.display().to_string());
    ui::kv(
        "Token validity",
        &format!("{}h", gateway_config.auth.token_validity_hours),
    );
    println!();
    ui::info("Press Ctrl+C to stop");

    trainportal_gateway::start(gateway_config).await?;

    Ok(())
}

async fn gateway_status(config_path: Option<&Path>) -> Result<()> {
    ui::header("Gateway Status");

    let port = load_config(config_path).map_or(3000, |c| c.server.port);
    let url = format!("http://127.0.0.1:{port}/health");

    let client = reqwest::Client::new();
    match client
        .get(&url)
        .timeout(std::time::Duration::from_secs(2))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            ui::success(&format!("Gateway is running on port {port}"));
            if let Ok(body) = resp.json::<serde_json::Value>().await {
                if let Some(version) = body.get("version").and_then(|v| v.as_str()) {
                    ui::kv("Version", version);
                }
                if let Some(status) = body.get("status").and_then(|v| v.as_str()) {
                    ui::kv("Status", status);
                }
            }
        }
        Ok(resp) => {
            ui::warning(&format!("Health check returned {}", resp.status()));
        }
        Err(_) => {
            ui::warning(&format!("Gateway is not running on port {port}"));
            ui::info("Start with: trainportal gateway run");
        }
    }

    Ok(())
}
