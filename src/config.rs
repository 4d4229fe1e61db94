//! Configuration management for mcp-onboard
//!
//! Configuration is read from a YAML file, then overridden by
//! `MCP_ONBOARD_*` environment variables, then by CLI flags, and finally
//! validated. A missing file is not an error: defaults are used and a
//! warning is logged.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::control_plane::ControlPlaneClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{OnboardError, Result};
use crate::oauth2::callback::CallbackTarget;
use crate::oauth2::discovery::DiscoveryMode;
use crate::permissions::{Actor, Role};

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Control-plane connection settings
    #[serde(default)]
    pub control_plane: ControlPlaneConfig,
    /// OAuth2 discovery and callback settings
    #[serde(default)]
    pub oauth2: OAuth2Settings,
    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Control-plane connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlPlaneConfig {
    /// Base URL of the control-plane API
    #[serde(default = "default_control_plane_url")]
    pub url: String,

    /// Active organization, sent on every request
    #[serde(default)]
    pub org_id: Option<String>,

    /// Role to act as
    #[serde(default)]
    pub act_as: Role,

    /// Per-request timeout
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Acting user, used for ownership checks on connected accounts
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_control_plane_url() -> String {
    "http://localhost:8000/v1".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            url: default_control_plane_url(),
            org_id: None,
            act_as: Role::default(),
            timeout_seconds: default_timeout_seconds(),
            user_id: None,
        }
    }
}

/// OAuth2 discovery and callback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Settings {
    /// Origin the authorization server redirects back to
    #[serde(default = "default_callback_origin")]
    pub callback_origin: String,

    /// Path of the account callback page
    #[serde(default = "default_callback_path")]
    pub callback_path: String,

    /// Where discovery probes run
    #[serde(default)]
    pub discovery_mode: DiscoveryMode,
}

fn default_callback_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_callback_path() -> String {
    "/connected-accounts/callback".to_string()
}

impl Default for OAuth2Settings {
    fn default() -> Self {
        Self {
            callback_origin: default_callback_origin(),
            callback_path: default_callback_path(),
            discovery_mode: DiscoveryMode::default(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,

    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "mcp_onboard=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Config`] if the file exists but cannot be read
    /// or parsed.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| OnboardError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&contents)
    }

    /// Parses configuration from YAML text without applying overrides.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| OnboardError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("MCP_ONBOARD_CONTROL_PLANE_URL") {
            self.control_plane.url = url;
        }

        if let Ok(org_id) = std::env::var("MCP_ONBOARD_ORG_ID") {
            self.control_plane.org_id = Some(org_id).filter(|o| !o.trim().is_empty());
        }

        if let Ok(user_id) = std::env::var("MCP_ONBOARD_USER_ID") {
            self.control_plane.user_id = Some(user_id).filter(|u| !u.trim().is_empty());
        }

        if let Ok(act_as) = std::env::var("MCP_ONBOARD_ACT_AS") {
            match act_as.parse::<Role>() {
                Ok(role) => self.control_plane.act_as = role,
                Err(e) => tracing::warn!("Ignoring MCP_ONBOARD_ACT_AS: {}", e),
            }
        }

        if let Ok(timeout) = std::env::var("MCP_ONBOARD_TIMEOUT_SECONDS") {
            match timeout.parse::<u64>() {
                Ok(secs) => self.control_plane.timeout_seconds = secs,
                Err(_) => tracing::warn!("Ignoring non-numeric MCP_ONBOARD_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        if let Ok(origin) = std::env::var("MCP_ONBOARD_CALLBACK_ORIGIN") {
            self.oauth2.callback_origin = origin;
        }

        if let Ok(mode) = std::env::var("MCP_ONBOARD_DISCOVERY_MODE") {
            match mode.parse::<DiscoveryMode>() {
                Ok(mode) => self.oauth2.discovery_mode = mode,
                Err(e) => tracing::warn!("Ignoring MCP_ONBOARD_DISCOVERY_MODE: {}", e),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(org) = &cli.org {
            self.control_plane.org_id = Some(org.clone());
        }
        if let Some(user) = &cli.user {
            self.control_plane.user_id = Some(user.clone());
        }
        if let Some(role) = cli.act_as {
            self.control_plane.act_as = role;
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Config`] for an unparsable control-plane URL
    /// or callback origin, a zero timeout, or a callback path that does not
    /// start with `/`.
    pub fn validate(&self) -> Result<()> {
        self.control_plane_url()?;

        if self.control_plane.timeout_seconds == 0 {
            return Err(
                OnboardError::Config("timeout_seconds must be greater than 0".to_string()).into(),
            );
        }

        if !self.oauth2.callback_path.starts_with('/') {
            return Err(OnboardError::Config(format!(
                "oauth2.callback_path must start with '/': {}",
                self.oauth2.callback_path
            ))
            .into());
        }

        self.callback_target()?;
        Ok(())
    }

    /// Parsed control-plane base URL.
    pub fn control_plane_url(&self) -> Result<Url> {
        let url = Url::parse(&self.control_plane.url).map_err(|e| {
            OnboardError::Config(format!(
                "invalid control_plane.url '{}': {}",
                self.control_plane.url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(OnboardError::Config(format!(
                "control_plane.url must be http or https: {}",
                self.control_plane.url
            ))
            .into());
        }
        Ok(url)
    }

    /// The acting user.
    ///
    /// Ownership checks compare account owners against this id on the
    /// client side, so it must be the backend-issued user id.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Config`] when neither `control_plane.user_id`,
    /// `MCP_ONBOARD_USER_ID` nor `--user` provides one.
    pub fn actor(&self) -> Result<Actor> {
        let user_id = self
            .control_plane
            .user_id
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| {
                OnboardError::Config(
                    "No user id configured; set control_plane.user_id, MCP_ONBOARD_USER_ID or pass --user"
                        .to_string(),
                )
            })?;
        let actor = Actor::new(user_id, self.control_plane.act_as);
        Ok(match &self.control_plane.org_id {
            Some(org) => actor.with_org(org.clone()),
            None => actor,
        })
    }

    /// HTTP client settings, with the token resolved from the environment
    /// or the keyring.
    pub fn client_config(&self) -> Result<ControlPlaneClientConfig> {
        let base_url = self.control_plane_url()?;
        let access_token = CredentialStore::for_control_plane(&base_url).resolve();
        Ok(ControlPlaneClientConfig {
            base_url,
            access_token,
            org_id: self.control_plane.org_id.clone(),
            act_as: self.control_plane.act_as,
            timeout: Duration::from_secs(self.control_plane.timeout_seconds),
        })
    }

    /// Where OAuth2 account flows return to.
    pub fn callback_target(&self) -> Result<CallbackTarget> {
        CallbackTarget::new(&self.oauth2.callback_origin, &self.oauth2.callback_path)
    }
}
