//! Bundle membership rules
//!
//! A configuration may join a bundle only if it has a usable connected
//! account for the acting user:
//!
//! - `shared`: any account referencing the configuration, whoever made it
//! - `individual`: an account owned by the acting user
//! - `operational`: never; such configurations are not even offered
//!
//! The rule is checked when a configuration is added. Existing bundle
//! members are not re-checked later.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::control_plane::ControlPlane;
use crate::error::{OnboardError, Result};
use crate::models::{Bundle, Configuration, ConfigurationQuery, ConnectedAccount, NewBundle, Ownership};
use crate::permissions::{Actor, Capability};

/// Returns `true` when `configuration` has a usable account for `acting_user_id`.
///
/// Monotonic in `accounts`: adding accounts never turns `true` into `false`.
pub fn has_usable_account(
    configuration: &Configuration,
    accounts: &[ConnectedAccount],
    acting_user_id: &str,
) -> bool {
    let mut for_config = accounts
        .iter()
        .filter(|a| a.mcp_server_configuration_id == configuration.id);
    match configuration.ownership {
        Ownership::Shared => for_config.next().is_some(),
        Ownership::Individual => for_config.any(|a| a.is_owned_by(acting_user_id)),
        Ownership::Operational => false,
    }
}

/// A configuration offered for bundling.
#[derive(Debug, Clone, Serialize)]
pub struct BundleCandidate {
    /// The configuration
    pub configuration: Configuration,
    /// Whether it can be added right now
    pub addable: bool,
}

/// Lists non-operational configurations with their addability.
pub fn bundle_candidates(
    configurations: &[Configuration],
    accounts: &[ConnectedAccount],
    acting_user_id: &str,
) -> Vec<BundleCandidate> {
    configurations
        .iter()
        .filter(|c| c.ownership != Ownership::Operational)
        .map(|c| BundleCandidate {
            configuration: c.clone(),
            addable: has_usable_account(c, accounts, acting_user_id),
        })
        .collect()
}

/// Collects checked configurations and creates the bundle.
#[derive(Debug)]
pub struct BundleBuilder {
    control_plane: Arc<dyn ControlPlane>,
    actor: Actor,
    name: String,
    configurations: Vec<Configuration>,
    accounts: Vec<ConnectedAccount>,
    selected: BTreeSet<String>,
}

impl BundleBuilder {
    /// Loads the configurations and accounts visible to `actor`.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::PermissionDenied`] without `manage_bundles`,
    /// and backend errors from the list calls.
    pub async fn load(
        control_plane: Arc<dyn ControlPlane>,
        actor: Actor,
        name: impl Into<String>,
    ) -> Result<Self> {
        actor.require(Capability::ManageBundles)?;
        let configurations = control_plane
            .list_configurations(&ConfigurationQuery::default())
            .await?
            .data;
        let accounts = control_plane.list_connected_accounts(None).await?;
        tracing::debug!(
            configurations = configurations.len(),
            accounts = accounts.len(),
            "bundle candidates loaded"
        );
        Ok(Self {
            control_plane,
            actor,
            name: name.into(),
            configurations,
            accounts,
            selected: BTreeSet::new(),
        })
    }

    /// Current candidates.
    pub fn candidates(&self) -> Vec<BundleCandidate> {
        bundle_candidates(&self.configurations, &self.accounts, &self.actor.user_id)
    }

    /// Adds a configuration after checking it.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Validation`] for an unknown, operational or
    /// unusable configuration.
    pub fn add(&mut self, configuration_id: &str) -> Result<()> {
        let configuration = self
            .configurations
            .iter()
            .find(|c| c.id == configuration_id)
            .ok_or_else(|| {
                OnboardError::Validation(format!("configuration '{configuration_id}' not found"))
            })?;

        if configuration.ownership == Ownership::Operational {
            return Err(OnboardError::Validation(format!(
                "configuration '{configuration_id}' is operational and cannot be bundled"
            ))
            .into());
        }
        if !has_usable_account(configuration, &self.accounts, &self.actor.user_id) {
            let hint = match configuration.ownership {
                Ownership::Shared => "the shared account has not been set up",
                _ => "you have no connected account for it",
            };
            return Err(OnboardError::Validation(format!(
                "configuration '{configuration_id}' cannot be bundled: {hint}"
            ))
            .into());
        }
        self.selected.insert(configuration_id.to_string());
        Ok(())
    }

    /// Selected configuration ids.
    pub fn selected(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    /// Creates the bundle.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Validation`] for a blank name or an empty
    /// selection, and backend errors from the create call.
    pub async fn create(self) -> Result<Bundle> {
        if self.name.trim().is_empty() {
            return Err(OnboardError::Validation("bundle name is required".to_string()).into());
        }
        if self.selected.is_empty() {
            return Err(OnboardError::Validation(
                "a bundle needs at least one configuration".to_string(),
            )
            .into());
        }
        let body = NewBundle {
            name: self.name.trim().to_string(),
            mcp_server_configuration_ids: self.selected.into_iter().collect(),
        };
        let bundle = self.control_plane.create_bundle(&body).await?;
        tracing::info!(bundle_id = %bundle.id, members = body.mcp_server_configuration_ids.len(), "bundle created");
        Ok(bundle)
    }
}
