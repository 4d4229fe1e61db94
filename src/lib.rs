//! mcp-onboard - MCP resource server onboarding library
//!
//! This library registers MCP resource servers with a control plane,
//! negotiates how their callers authenticate, and provisions per-user or
//! shared access to them.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `models`: resource servers, auth configs, configurations, accounts, bundles
//! - `oauth2`: metadata discovery, dynamic client registration, callback URLs
//! - `wizard`: the step-by-step configuration wizard and its commit
//! - `provision`: connected account creation per auth type
//! - `bundle`: bundle membership rules
//! - `sync`: tool re-sync with a cooldown
//! - `permissions`: capability checks done before any network call
//! - `control_plane`: the backend API trait and its HTTP client
//! - `credentials`: access token storage in the OS keyring
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli` / `commands`: the command-line front end
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mcp_onboard::config::Config;
//! use mcp_onboard::control_plane::{ControlPlane, HttpControlPlane};
//! use mcp_onboard::oauth2::OAuth2DiscoveryClient;
//! use mcp_onboard::wizard::{Surface, WizardSession};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::default();
//! config.validate()?;
//! let control_plane: Arc<dyn ControlPlane> =
//!     Arc::new(HttpControlPlane::new(config.client_config()?)?);
//! let session = WizardSession::new(
//!     Surface::FullOnboarding,
//!     config.actor()?,
//!     control_plane.clone(),
//!     OAuth2DiscoveryClient::new(control_plane),
//! )?;
//! println!("first step: {}", session.current());
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod cli;
pub mod commands;
pub mod config;
pub mod control_plane;
pub mod credentials;
pub mod error;
pub mod models;
pub mod oauth2;
pub mod permissions;
pub mod provision;
pub mod sync;
pub mod wizard;

// Re-export commonly used types
pub use config::Config;
pub use error::{OnboardError, Result};
