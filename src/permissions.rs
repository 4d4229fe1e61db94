//! Capability checks performed before any network call
//!
//! An action attempted without the required capability fails locally with
//! [`OnboardError::PermissionDenied`] naming the missing capability, so the
//! user never sees a generic network error for a permission problem.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{OnboardError, Result};

/// An action class the control plane guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Register and delete resource servers
    ManageResourceServers,
    /// Create and edit configurations
    ManageConfigurations,
    /// Provision connected accounts
    CreateConnectedAccount,
    /// Create and edit bundles
    ManageBundles,
    /// Trigger tool re-syncs
    SyncTools,
}

impl Capability {
    /// Snake-case name used in messages and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::ManageResourceServers => "manage_resource_servers",
            Capability::ManageConfigurations => "manage_configurations",
            Capability::CreateConnectedAccount => "create_connected_account",
            Capability::ManageBundles => "manage_bundles",
            Capability::SyncTools => "sync_tools",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organization role presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access
    Admin,
    /// Can provision own accounts and build bundles
    #[default]
    Member,
}

impl Role {
    /// Capabilities granted by this role.
    pub fn capabilities(&self) -> BTreeSet<Capability> {
        match self {
            Role::Admin => [
                Capability::ManageResourceServers,
                Capability::ManageConfigurations,
                Capability::CreateConnectedAccount,
                Capability::ManageBundles,
                Capability::SyncTools,
            ]
            .into_iter()
            .collect(),
            Role::Member => [Capability::CreateConnectedAccount, Capability::ManageBundles]
                .into_iter()
                .collect(),
        }
    }

    /// Wire name sent as the act-as header.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }
}

impl FromStr for Role {
    type Err = OnboardError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" | "owner" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            other => Err(OnboardError::Config(format!(
                "unknown role '{other}', expected admin or member"
            ))),
        }
    }
}

/// The user on whose behalf operations run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Acting user
    pub user_id: String,
    /// Active organization
    pub org_id: Option<String>,
    /// Role the actor acts as
    pub role: Role,
    capabilities: BTreeSet<Capability>,
}

impl Actor {
    /// Creates an actor with the capabilities of `role`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcp_onboard::permissions::{Actor, Capability, Role};
    ///
    /// let actor = Actor::new("user_1", Role::Member);
    /// assert!(actor.require(Capability::CreateConnectedAccount).is_ok());
    /// assert!(actor.require(Capability::ManageConfigurations).is_err());
    /// ```
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            org_id: None,
            role,
            capabilities: role.capabilities(),
        }
    }

    /// Sets the active organization.
    pub fn with_org(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Replaces the capability set, for callers whose backend reports a
    /// finer-grained grant than the role preset.
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    /// Returns `true` when the actor holds `capability`.
    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Fails with [`OnboardError::PermissionDenied`] unless the actor holds
    /// `capability`.
    pub fn require(&self, capability: Capability) -> Result<()> {
        if self.can(capability) {
            Ok(())
        } else {
            tracing::debug!(user = %self.user_id, %capability, "capability check failed");
            Err(OnboardError::PermissionDenied {
                capability: capability.to_string(),
            }
            .into())
        }
    }
}
