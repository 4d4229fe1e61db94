//! Configurations binding a resource server to an organization

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OnboardError;
use crate::models::auth_config::AuthType;

/// Who a configuration's connected accounts belong to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ownership {
    /// Every user creates their own connected account
    #[default]
    Individual,
    /// One account is reused by all authorized users
    Shared,
    /// Reserved for the platform's own administrative calls
    Operational,
}

impl Ownership {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Ownership::Individual => "individual",
            Ownership::Shared => "shared",
            Ownership::Operational => "operational",
        }
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ownership {
    type Err = OnboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "individual" => Ok(Ownership::Individual),
            "shared" => Ok(Ownership::Shared),
            "operational" => Ok(Ownership::Operational),
            other => Err(OnboardError::Validation(format!(
                "invalid ownership '{other}', expected individual, shared or operational"
            ))),
        }
    }
}

/// Which of a server's tools a configuration enables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPolicy {
    /// Enable every tool, including ones added by later re-syncs
    pub all_tools_enabled: bool,
    /// Explicit allow-set, ignored when `all_tools_enabled` is set
    #[serde(default)]
    pub enabled_tools: BTreeSet<String>,
}

impl Default for ToolPolicy {
    fn default() -> Self {
        Self {
            all_tools_enabled: true,
            enabled_tools: BTreeSet::new(),
        }
    }
}

impl ToolPolicy {
    /// Returns `true` when the policy enables at least one tool.
    pub fn is_satisfied(&self) -> bool {
        self.all_tools_enabled || !self.enabled_tools.is_empty()
    }
}

/// A persisted MCP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    /// Stable identifier
    pub id: String,
    /// Resource server this configuration binds
    pub mcp_server_id: String,
    /// Display name, usually the server name
    #[serde(default)]
    pub name: String,
    /// Selected authentication strategy
    pub auth_type: AuthType,
    /// Ownership mode of its connected accounts
    #[serde(rename = "connected_account_ownership")]
    pub ownership: Ownership,
    /// Enable all tools
    #[serde(default)]
    pub all_tools_enabled: bool,
    /// Explicit tool allow-set
    #[serde(default)]
    pub enabled_tools: Vec<String>,
    /// Teams allowed to use it; empty means unrestricted
    #[serde(default)]
    pub allowed_teams: Vec<String>,
    /// Creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Create body for `POST /mcp-server-configurations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConfiguration {
    /// Resource server to bind
    pub mcp_server_id: String,
    /// Selected authentication strategy
    pub auth_type: AuthType,
    /// Ownership mode
    #[serde(rename = "connected_account_ownership")]
    pub ownership: Ownership,
    /// Enable all tools
    pub all_tools_enabled: bool,
    /// Explicit tool allow-set
    pub enabled_tools: Vec<String>,
    /// Team scope; empty means unrestricted
    pub allowed_teams: Vec<String>,
}

/// Query parameters for `GET /mcp-server-configurations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigurationQuery {
    /// Index of the first item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Maximum page size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    /// Ownership filter
    #[serde(
        rename = "connected_account_ownerships",
        skip_serializing_if = "Option::is_none"
    )]
    pub ownership: Option<Ownership>,
}

/// Paginated list envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page
    pub data: Vec<T>,
    /// Offset of the first item
    #[serde(default)]
    pub offset: u32,
    /// Total number of items, when the backend reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}
