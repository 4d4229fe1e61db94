//! Command-line interface definition for mcp-onboard
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::models::Ownership;
use crate::permissions::Role;
use crate::wizard::Surface;

/// mcp-onboard - register MCP resource servers and provision access
///
/// Discovers OAuth2 metadata, registers clients, drives the configuration
/// wizard, provisions connected accounts and assembles bundles against a
/// control-plane API.
#[derive(Parser, Debug, Clone)]
#[command(name = "mcp-onboard")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Organization to act in (overrides config)
    #[arg(long, global = true)]
    pub org: Option<String>,

    /// Acting user id (overrides config)
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Role to act as: admin or member (overrides config)
    #[arg(long, global = true)]
    pub act_as: Option<Role>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Store a control-plane access token in the OS keyring
    Login {
        /// Access token
        #[arg(long)]
        token: String,

        /// Token lifetime in seconds
        #[arg(long)]
        expires_in: Option<i64>,
    },

    /// Remove the stored access token
    Logout,

    /// Probe a resource server for OAuth2 metadata
    Discover {
        /// Resource server URL
        url: String,

        /// Probe the server's well-known endpoints directly
        #[arg(long)]
        direct: bool,
    },

    /// Discover and register an OAuth2 client for a resource server
    RegisterClient {
        /// Resource server URL
        url: String,
    },

    /// Check a resource server name against the naming rule
    ValidateName {
        /// Candidate name
        name: String,
    },

    /// Run the configuration wizard from an answers file
    Wizard {
        /// Surface: server-registration, configuration, full-onboarding, operational-account
        #[arg(short, long, default_value = "full-onboarding")]
        surface: Surface,

        /// YAML answers file
        #[arg(short, long)]
        answers: PathBuf,

        /// Existing resource server (configuration surfaces)
        #[arg(long)]
        server_id: Option<String>,
    },

    /// Configuration commands
    Configurations {
        /// Configuration subcommand
        #[command(subcommand)]
        command: ConfigurationCommand,
    },

    /// Connected account commands
    Accounts {
        /// Account subcommand
        #[command(subcommand)]
        command: AccountCommand,
    },

    /// Bundle commands
    Bundle {
        /// Bundle subcommand
        #[command(subcommand)]
        command: BundleCommand,
    },

    /// Resource server commands
    Servers {
        /// Server subcommand
        #[command(subcommand)]
        command: ServerCommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigurationCommand {
    /// List configurations
    List {
        /// Filter by ownership (shared, individual, operational)
        #[arg(long)]
        ownership: Option<Ownership>,

        /// Index of the first item
        #[arg(long)]
        offset: Option<u32>,

        /// Page size
        #[arg(long)]
        limit: Option<u32>,
    },
}

/// Connected account subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AccountCommand {
    /// Create a connected account for a configuration
    Create {
        /// Configuration id
        configuration_id: String,

        /// API key, for api_key configurations
        #[arg(long, env = "MCP_ONBOARD_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Page to resume after the OAuth2 callback
        #[arg(long)]
        return_to: Option<String>,
    },

    /// Handle the URL the OAuth2 flow returned to
    Callback {
        /// Full callback URL
        url: String,

        /// Configuration to confirm the account for
        #[arg(long)]
        configuration_id: Option<String>,
    },

    /// List connected accounts
    List {
        /// Only accounts for this configuration
        #[arg(long)]
        configuration_id: Option<String>,
    },
}

/// Bundle subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum BundleCommand {
    /// Show which configurations can be bundled
    Candidates,

    /// Create a bundle
    Create {
        /// Bundle name
        #[arg(short, long)]
        name: String,

        /// Configuration ids to include
        #[arg(long = "configuration", required = true)]
        configurations: Vec<String>,
    },
}

/// Resource server subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ServerCommand {
    /// Re-sync a server's tool list
    Refresh {
        /// Resource server id
        server_id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
