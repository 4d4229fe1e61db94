//! Resource servers: external tool-providing endpoints

use std::collections::BTreeSet;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{OnboardError, Result};
use crate::models::auth_config::{AuthConfig, AuthType};

/// A tool declared by a resource server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tool {
    /// Stable tool identifier
    pub id: String,
    /// Tool name as exposed by the server
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
}

/// A registered resource server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceServer {
    /// Stable identifier
    pub id: String,
    /// Organization-scoped unique name, see [`validate_server_name`]
    pub name: String,
    /// Base URL of the server
    pub url: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Optional logo URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Free-form category labels
    #[serde(default)]
    pub categories: Vec<String>,
    /// Declared tools
    #[serde(default)]
    pub tools: Vec<Tool>,
    /// Accepted authentication strategies
    #[serde(default)]
    pub auth_configs: Vec<AuthConfig>,
    /// Completion time of the last tool re-sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl ResourceServer {
    /// Auth types declared by this server, in declaration order.
    pub fn supported_auth_types(&self) -> Vec<AuthType> {
        self.auth_configs.iter().map(AuthConfig::auth_type).collect()
    }

    /// Returns the declared config of the given type, if any.
    pub fn auth_config(&self, auth_type: AuthType) -> Option<&AuthConfig> {
        self.auth_configs
            .iter()
            .find(|c| c.auth_type() == auth_type)
    }
}

/// Create body for `POST /mcp-servers`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewResourceServer {
    /// Server name
    pub name: String,
    /// Base URL
    pub url: String,
    /// Description
    pub description: String,
    /// Optional logo URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Category labels
    #[serde(default)]
    pub categories: Vec<String>,
    /// Accepted authentication strategies
    pub auth_configs: Vec<AuthConfig>,
    /// Strategy used by the platform's own operational account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operational_account_auth_type: Option<AuthType>,
}

/// Result of `POST /mcp-servers/{id}/refresh-tools`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRefreshSummary {
    /// Tools that appeared on the server
    #[serde(default)]
    pub tools_created: BTreeSet<String>,
    /// Tools whose definition changed
    #[serde(default)]
    pub tools_updated: BTreeSet<String>,
    /// Tools no longer offered
    #[serde(default)]
    pub tools_deleted: BTreeSet<String>,
    /// Tools left untouched
    #[serde(default)]
    pub tools_unchanged: BTreeSet<String>,
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z0-9_]+$").expect("static name pattern is valid"))
}

/// Returns `true` when `name` is a valid resource server name.
///
/// Valid names use only uppercase letters, digits and underscores, and never
/// contain two consecutive underscores.
///
/// # Examples
///
/// ```
/// use mcp_onboard::models::is_valid_server_name;
///
/// assert!(is_valid_server_name("GITHUB_API"));
/// assert!(!is_valid_server_name("github-api"));
/// assert!(!is_valid_server_name("A__B"));
/// ```
pub fn is_valid_server_name(name: &str) -> bool {
    name_pattern().is_match(name) && !name.contains("__")
}

/// Validates a resource server name, describing the first broken rule.
///
/// # Errors
///
/// Returns [`OnboardError::Validation`] when the name is empty, uses
/// characters outside `A-Z`, `0-9`, `_`, or contains `"__"`.
pub fn validate_server_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(OnboardError::Validation("server name is required".to_string()).into());
    }
    if !name_pattern().is_match(name) {
        return Err(OnboardError::Validation(format!(
            "server name '{name}' may only contain uppercase letters, digits and underscores"
        ))
        .into());
    }
    if name.contains("__") {
        return Err(OnboardError::Validation(format!(
            "server name '{name}' must not contain consecutive underscores"
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth_config::KeyLocation;

    #[test]
    fn test_name_rule_examples() {
        assert!(is_valid_server_name("GITHUB_API"));
        assert!(is_valid_server_name("BRAVE_SEARCH_2"));
        assert!(!is_valid_server_name("github-api"));
        assert!(!is_valid_server_name("A__B"));
        assert!(!is_valid_server_name(""));
        assert!(!is_valid_server_name("GITHUB API"));
    }

    #[test]
    fn test_validate_server_name_messages() {
        let err = validate_server_name("").unwrap_err();
        assert!(err.to_string().contains("required"));
        let err = validate_server_name("lower").unwrap_err();
        assert!(err.to_string().contains("uppercase"));
        let err = validate_server_name("A__B").unwrap_err();
        assert!(err.to_string().contains("consecutive"));
        assert!(validate_server_name("NOTION").is_ok());
    }

    #[test]
    fn test_supported_auth_types_preserve_order() {
        let server = ResourceServer {
            id: "srv_1".to_string(),
            name: "BRAVE".to_string(),
            url: "https://brave.example.com/mcp".to_string(),
            description: String::new(),
            logo: None,
            categories: vec![],
            tools: vec![],
            auth_configs: vec![
                AuthConfig::NoAuth,
                AuthConfig::ApiKey {
                    location: KeyLocation::Header,
                    name: "X-Key".to_string(),
                    prefix: None,
                },
            ],
            last_synced_at: None,
        };
        assert_eq!(
            server.supported_auth_types(),
            vec![AuthType::NoAuth, AuthType::ApiKey]
        );
        assert!(server.auth_config(AuthType::OAuth2).is_none());
    }

    #[test]
    fn test_refresh_summary_deserializes_partial_body() {
        let summary: ToolRefreshSummary =
            serde_json::from_str(r#"{"tools_created":["search"]}"#).unwrap();
        assert!(summary.tools_created.contains("search"));
        assert!(summary.tools_deleted.is_empty());
    }
}
