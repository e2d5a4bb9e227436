//! Training portal CLI - run the gateway and administer accounts.

mod commands;
mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use trainportal_core::{Config, LogFormat, LoggingConfig};

use commands::admin::{AdminAction, AdminArgs};
use commands::config::ConfigAction;
use commands::gateway::GatewayAction;

#[derive(Parser)]
#[command(name = "trainportal")]
#[command(about = "Training portal identity and access service")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.trainportal/trainportal.json)
    #[arg(long, global = true, env = "TRAINPORTAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gateway operations
    Gateway {
        #[command(subcommand)]
        action: GatewayCommands,
    },

    /// User management (admin commands)
    Admin {
        #[command(subcommand)]
        action: AdminCommands,

        /// Data directory override
        #[arg(long, global = true)]
        data_dir: Option<PathBuf>,
    },

    /// Configuration inspection
    Config {
        #[command(subcommand)]
        action: Option<ConfigCommands>,
    },

    /// Signing secret helpers
    Secret {
        #[command(subcommand)]
        action: SecretCommands,
    },
}

#[derive(Subcommand)]
enum GatewayCommands {
    /// Start the gateway server
    Run {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Check gateway status
    Status,
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create a new user
    Create {
        /// Login email
        #[arg(long)]
        email: String,

        /// Display name
        #[arg(long, default_value = "Administrator")]
        name: String,

        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,

        /// User role: employee, trainer, or admin
        #[arg(long, default_value = "admin")]
        role: String,

        /// Generate a random password
        #[arg(long, conflicts_with = "password")]
        generate_password: bool,
    },

    /// List all users
    List,

    /// Reset a user's password
    ResetPassword {
        /// Email of the user
        #[arg(long)]
        email: String,
    },

    /// Delete a user
    Delete {
        /// Email of the user to delete
        #[arg(long)]
        email: String,

        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show effective configuration
    Show,

    /// Validate configuration
    Validate,

    /// Print the config file path
    Path,

    /// Write a starter config with a generated secret
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum SecretCommands {
    /// Generate a random 256-bit signing secret
    Generate {
        /// Print only the secret
        #[arg(short, long)]
        quiet: bool,
    },
}

fn init_logging(verbose: bool, logging: &LoggingConfig) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(false)).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    // A broken config still gets default logging so the error is reported.
    let loaded = commands::load_config(config_path);
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_logging(cli.verbose, &logging);

    match cli.command {
        Commands::Gateway { action } => {
            let action = match action {
                GatewayCommands::Run { port, bind } => GatewayAction::Run { port, bind },
                GatewayCommands::Status => GatewayAction::Status,
            };
            commands::run_gateway(action, config_path).await?;
        }

        Commands::Admin { action, data_dir } => {
            let config = match loaded {
                Ok(config) => config,
                Err(e) => {
                    ui::warning(&format!("Using default configuration: {e}"));
                    Config::default()
                }
            };

            let args = AdminArgs {
                action: match action {
                    AdminCommands::Create {
                        email,
                        name,
                        password,
                        role,
                        generate_password,
                    } => AdminAction::Create {
                        email,
                        name,
                        password,
                        role,
                        generate_password,
                    },
                    AdminCommands::List => AdminAction::List,
                    AdminCommands::ResetPassword { email } => AdminAction::ResetPassword { email },
                    AdminCommands::Delete { email, yes } => AdminAction::Delete { email, yes },
                },
                data_dir,
            };
            commands::run_admin(args, &config).await?;
        }

        Commands::Config { action } => {
            let action = match action {
                Some(ConfigCommands::Show) | None => ConfigAction::Show,
                Some(ConfigCommands::Validate) => ConfigAction::Validate,
                Some(ConfigCommands::Path) => ConfigAction::Path,
                Some(ConfigCommands::Init { force }) => ConfigAction::Init { force },
            };
            commands::run_config(action, config_path)?;
        }

        Commands::Secret {
            action: SecretCommands::Generate { quiet },
        } => {
            commands::run_secret(quiet)?;
        }
    }

    Ok(())
}
