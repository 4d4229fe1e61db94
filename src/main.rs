//! mcp-onboard - MCP resource server onboarding CLI
//!
#![doc = "Main entry point for the mcp-onboard command-line tool."]

use std::path::Path;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcp_onboard::cli::{
    AccountCommand, BundleCommand, Cli, Commands, ConfigurationCommand, ServerCommand,
};
use mcp_onboard::commands;
use mcp_onboard::config::{Config, DEFAULT_CONFIG_PATH};
use mcp_onboard::models::ConfigurationQuery;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH);
    let config = Config::load(config_path, &cli)?;

    init_tracing(&config, cli.verbose);
    if !Path::new(config_path).exists() {
        tracing::debug!("No config file at {}, using defaults", config_path);
    }

    // Validate configuration
    config.validate()?;

    let json = cli.json;
    match cli.command {
        Commands::Login { token, expires_in } => commands::auth::login(&config, &token, expires_in),
        Commands::Logout => commands::auth::logout(&config),
        Commands::Discover { url, direct } => {
            commands::discover::run_discover(&config, &url, direct, json).await
        }
        Commands::RegisterClient { url } => {
            commands::discover::run_register_client(&config, &url, json).await
        }
        Commands::ValidateName { name } => commands::discover::validate_name(&name, json),
        Commands::Wizard {
            surface,
            answers,
            server_id,
        } => {
            tracing::info!("Starting {} wizard", surface);
            commands::wizard::run_wizard(&config, surface, &answers, server_id, json).await
        }
        Commands::Configurations { command } => match command {
            ConfigurationCommand::List {
                ownership,
                offset,
                limit,
            } => {
                let query = ConfigurationQuery {
                    offset,
                    limit,
                    ownership,
                };
                commands::configurations::list(&config, query, json).await
            }
        },
        Commands::Accounts { command } => match command {
            AccountCommand::Create {
                configuration_id,
                api_key,
                return_to,
            } => {
                commands::accounts::create(&config, &configuration_id, api_key, return_to, json)
                    .await
            }
            AccountCommand::Callback {
                url,
                configuration_id,
            } => {
                commands::accounts::callback(&config, &url, configuration_id.as_deref(), json)
                    .await
            }
            AccountCommand::List { configuration_id } => {
                commands::accounts::list(&config, configuration_id.as_deref(), json).await
            }
        },
        Commands::Bundle { command } => match command {
            BundleCommand::Candidates => commands::bundles::candidates(&config, json).await,
            BundleCommand::Create {
                name,
                configurations,
            } => commands::bundles::create(&config, &name, &configurations, json).await,
        },
        Commands::Servers { command } => match command {
            ServerCommand::Refresh { server_id } => {
                commands::servers::refresh(&config, &server_id, json).await
            }
        },
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured
/// level; `-v` raises the default to debug. Logs go to stderr so `--json`
/// output stays parseable.
fn init_tracing(config: &Config, verbose: bool) {
    let default_filter = if verbose {
        "mcp_onboard=debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.logging.json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
