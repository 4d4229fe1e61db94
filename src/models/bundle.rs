//! Bundles: named groups of configurations behind one callable key

use serde::{Deserialize, Serialize};

/// A persisted bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    /// Stable identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Owning user; `None` for organization-owned bundles
    #[serde(default)]
    pub user_id: Option<String>,
    /// Opaque key that forms the bundle's external URL
    pub bundle_key: String,
    /// Member configurations
    #[serde(default)]
    pub mcp_server_configuration_ids: Vec<String>,
}

/// Create body for `POST /mcp-server-bundles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBundle {
    /// Display name
    pub name: String,
    /// Member configurations
    pub mcp_server_configuration_ids: Vec<String>,
}
