//! One interactive wizard run against the control plane
//!
//! A [`WizardSession`] owns its engine, its state and a control-plane
//! handle. Nothing is written to the backend before the final step: `next()`
//! on the last step re-validates every step and then commits with one
//! create call per record the surface produces.

use std::sync::Arc;

use serde::Serialize;

use crate::control_plane::ControlPlane;
use crate::error::{OnboardError, Result};
use crate::models::{
    AuthConfig, AuthType, Configuration, NewConfiguration, NewResourceServer, Ownership,
    ResourceServer,
};
use crate::oauth2::discovery::{DiscoveryOutcome, OAuth2DiscoveryClient};
use crate::oauth2::registration::{DcrResult, DynamicClientRegistrar};
use crate::permissions::Actor;
use crate::wizard::engine::{StepId, StepSpec, WizardEngine};
use crate::wizard::state::WizardState;
use crate::wizard::steps::Surface;

/// Records created by a successful commit.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommitReceipt {
    /// Newly registered server
    pub server: Option<ResourceServer>,
    /// Newly created configuration
    pub configuration: Option<Configuration>,
}

/// Result of a forward move.
#[derive(Debug, Clone)]
pub enum Advance {
    /// Moved to another step
    Moved(StepId),
    /// The last step was completed and the records were created
    Committed(CommitReceipt),
}

/// A wizard run.
#[derive(Debug)]
pub struct WizardSession {
    surface: Surface,
    engine: WizardEngine<WizardState>,
    state: WizardState,
    actor: Actor,
    control_plane: Arc<dyn ControlPlane>,
    discovery: OAuth2DiscoveryClient,
    registrar: DynamicClientRegistrar,
    pending: bool,
    started: bool,
    // Server created by an earlier commit attempt whose configuration
    // create failed; resubmitting reuses it.
    created_server: Option<ResourceServer>,
}

impl WizardSession {
    /// Opens a session on `surface`.
    ///
    /// Registration surfaces start with all three strategies declared.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::PermissionDenied`] when `actor` lacks a
    /// capability the surface needs.
    pub fn new(
        surface: Surface,
        actor: Actor,
        control_plane: Arc<dyn ControlPlane>,
        discovery: OAuth2DiscoveryClient,
    ) -> Result<Self> {
        for capability in surface.required_capabilities() {
            actor.require(*capability)?;
        }

        let mut state = WizardState::new();
        if surface.creates_server() {
            state.declared_auth_types = vec![AuthType::NoAuth, AuthType::ApiKey, AuthType::OAuth2];
        }
        if surface == Surface::OperationalAccount {
            state.ownership = Ownership::Operational;
        }
        state.teams_mandatory = surface.teams_mandatory();

        tracing::debug!(%surface, user = %actor.user_id, "wizard session opened");

        Ok(Self {
            surface,
            engine: WizardEngine::new(surface.steps())?,
            state,
            actor,
            registrar: DynamicClientRegistrar::new(control_plane.clone()),
            control_plane,
            discovery,
            pending: false,
            started: false,
            created_server: None,
        })
    }

    /// Replaces the state, keeping the surface's ownership and team rules.
    ///
    /// Call [`start`](Self::start) afterwards so the first step sees the
    /// new state.
    pub fn with_state(mut self, mut state: WizardState) -> Self {
        state.teams_mandatory = self.surface.teams_mandatory();
        if self.surface == Surface::OperationalAccount {
            state.ownership = Ownership::Operational;
        }
        self.state = state;
        self
    }

    /// Runs the entry actions of the first step: discovery when the session
    /// opens on Authentication with OAuth2 already selected, the team list
    /// when it opens on Teams. Later calls do nothing.
    pub async fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.on_enter(self.engine.current()).await;
    }

    /// The surface.
    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Current step.
    pub fn current(&self) -> StepId {
        self.engine.current()
    }

    /// Steps in order.
    pub fn steps(&self) -> &[StepSpec<WizardState>] {
        self.engine.steps()
    }

    /// Whether the cursor is on the final step.
    pub fn is_last(&self) -> bool {
        self.engine.is_last()
    }

    /// Read access to the collected state.
    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Write access to the collected state.
    pub fn state_mut(&mut self) -> &mut WizardState {
        &mut self.state
    }

    /// Whether a backend call is in flight.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether `next()` would be accepted.
    pub fn can_proceed(&self) -> bool {
        !self.pending && self.engine.can_proceed(&self.state)
    }

    /// Moves back one step and runs its entry actions.
    pub async fn prev(&mut self) -> Option<StepId> {
        let step = self.engine.prev()?;
        self.on_enter(step).await;
        Some(step)
    }

    /// Jumps to `step` and runs its entry actions.
    pub async fn go_to(&mut self, step: StepId) -> Result<()> {
        self.engine.go_to(step)?;
        self.on_enter(step).await;
        Ok(())
    }

    /// Selects a strategy. Switching to OAuth2 on the Authentication step
    /// runs discovery unless the current URL was already probed.
    pub async fn select_auth_type(&mut self, auth_type: AuthType) {
        let changed = self.state.selected_auth_type != Some(auth_type);
        self.state.select_auth_type(auth_type);
        if auth_type == AuthType::OAuth2
            && self.engine.current() == StepId::Authentication
            && (changed || self.state.discovery().is_none())
        {
            self.run_discovery().await;
        }
    }

    /// Probes the current server URL and merges the result into the state.
    pub async fn run_discovery(&mut self) -> DiscoveryOutcome {
        let outcome = match self.state.server_url() {
            Some(url) => {
                self.pending = true;
                let outcome = self.discovery.discover(&url).await;
                self.pending = false;
                outcome
            }
            None => DiscoveryOutcome::Unavailable {
                reason: "server URL is missing or invalid".to_string(),
            },
        };
        self.state.set_discovery(outcome.clone());
        outcome
    }

    /// Performs Dynamic Client Registration for the current server URL.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Registration`] when automatic registration is
    /// unavailable or the registration call fails. The manual path stays
    /// open either way.
    pub async fn register_client(&mut self) -> Result<DcrResult> {
        let registration = self.state.automatic_registration().ok_or_else(|| {
            OnboardError::Registration(
                "automatic registration is unavailable for this server".to_string(),
            )
        })?;
        let url = self.state.server_url().ok_or_else(|| {
            OnboardError::Registration("server URL is missing or invalid".to_string())
        })?;

        self.pending = true;
        let result = self.registrar.register(&url, &registration).await;
        self.pending = false;

        let dcr = result?;
        self.state.set_dcr(dcr.clone());
        Ok(dcr)
    }

    /// Moves forward, committing on the last step.
    ///
    /// # Errors
    ///
    /// - [`OnboardError::Wizard`] when a call is pending or the step is
    ///   incomplete.
    /// - [`OnboardError::Validation`] when a re-validated earlier step fails;
    ///   the cursor moves to that step.
    /// - [`OnboardError::StaleRegistration`] when the DCR result belongs to a
    ///   different server URL; the cursor moves to Authentication.
    /// - Backend errors from the create calls.
    pub async fn next(&mut self) -> Result<Advance> {
        if self.pending {
            return Err(OnboardError::Wizard("a request is still in flight".to_string()).into());
        }
        self.started = true;
        match self.engine.next(&self.state)? {
            Some(step) => {
                self.on_enter(step).await;
                Ok(Advance::Moved(step))
            }
            None => {
                self.pending = true;
                let result = self.commit().await;
                self.pending = false;
                result.map(Advance::Committed)
            }
        }
    }

    /// Discards the session. Nothing was persisted.
    pub fn cancel(self) {
        tracing::debug!(surface = %self.surface, step = %self.engine.current(), "wizard cancelled");
    }

    async fn on_enter(&mut self, step: StepId) {
        match step {
            StepId::Authentication if self.state.selected_auth_type == Some(AuthType::OAuth2) => {
                self.run_discovery().await;
            }
            StepId::Teams | StepId::OperationalAccount => {
                self.pending = true;
                let teams = self.control_plane.list_teams().await;
                self.pending = false;
                match teams {
                    Ok(teams) => self.state.available_teams = teams,
                    Err(e) => tracing::warn!(error = %e, "failed to list teams"),
                }
            }
            _ => {}
        }
    }

    fn check_before_commit(&mut self) -> Result<()> {
        if let Some(step) = self.engine.first_invalid(&self.state) {
            let label = self.engine.label_of(step).unwrap_or("unknown");
            self.engine.go_to(step)?;
            return Err(OnboardError::Validation(format!("step '{label}' is incomplete")).into());
        }
        if self.surface.creates_server() && self.state.server_url().is_none() {
            if self.engine.go_to(StepId::General).is_ok() {
                tracing::debug!("server URL invalid, returning to General");
            }
            return Err(OnboardError::Validation(format!(
                "server URL '{}' is not a valid URL",
                self.state.server_url_raw()
            ))
            .into());
        }
        if self.state.has_stale_dcr() {
            self.state.clear_dcr();
            self.engine.go_to(StepId::Authentication)?;
            return Err(OnboardError::StaleRegistration(
                "the client was registered for a different server URL; register again".to_string(),
            )
            .into());
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<CommitReceipt> {
        self.check_before_commit()?;

        let mut receipt = CommitReceipt::default();

        if self.surface.creates_server() {
            let server = match self.created_server.clone() {
                Some(server) => {
                    tracing::debug!(server_id = %server.id, "reusing server from earlier attempt");
                    server
                }
                None => {
                    let body = self.new_server_body()?;
                    let server = self.control_plane.create_resource_server(&body).await?;
                    tracing::info!(server_id = %server.id, name = %server.name, "resource server registered");
                    self.created_server = Some(server.clone());
                    server
                }
            };
            receipt.server = Some(server);
        }

        if self.surface.creates_configuration() {
            let server_id = match &self.created_server {
                Some(server) => Some(server.id.clone()),
                None => self.state.server_id.clone(),
            };
            let body = self.new_configuration_body(server_id)?;
            let configuration = self.control_plane.create_configuration(&body).await?;
            tracing::info!(
                configuration_id = %configuration.id,
                server_id = %configuration.mcp_server_id,
                ownership = %configuration.ownership,
                "configuration created"
            );
            receipt.configuration = Some(configuration);
        }

        Ok(receipt)
    }

    fn new_server_body(&self) -> Result<NewResourceServer> {
        let url = self
            .state
            .server_url()
            .ok_or_else(|| OnboardError::Validation("server URL is required".to_string()))?;
        let auth_configs: Vec<AuthConfig> = self.state.build_auth_config().into_iter().collect();
        let general = &self.state.general;
        Ok(NewResourceServer {
            name: general.name.clone(),
            url: url.to_string(),
            description: general.description.clone(),
            logo: general.logo.clone().filter(|l| !l.trim().is_empty()),
            categories: general.categories.clone(),
            operational_account_auth_type: auth_configs.first().map(AuthConfig::auth_type),
            auth_configs,
        })
    }

    fn new_configuration_body(&self, server_id: Option<String>) -> Result<NewConfiguration> {
        let server_id = server_id.ok_or_else(|| {
            OnboardError::Validation("no resource server selected for the configuration".to_string())
        })?;
        let policy = &self.state.tool_policy;
        Ok(NewConfiguration {
            mcp_server_id: server_id,
            auth_type: self.state.selected_auth_type.unwrap_or(AuthType::NoAuth),
            ownership: self.state.ownership,
            all_tools_enabled: policy.all_tools_enabled,
            enabled_tools: if policy.all_tools_enabled {
                Vec::new()
            } else {
                policy.enabled_tools.iter().cloned().collect()
            },
            allowed_teams: self.state.selected_teams.iter().cloned().collect(),
        })
    }

    /// The acting user.
    pub fn actor(&self) -> &Actor {
        &self.actor
    }
}
