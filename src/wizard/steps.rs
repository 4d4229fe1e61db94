//! Step predicates and the surfaces that host the wizard

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OnboardError;
use crate::models::{is_valid_server_name, requires_client_secret, AuthType};
use crate::permissions::Capability;
use crate::wizard::engine::{StepId, StepSpec};
use crate::wizard::state::{RegistrationMode, WizardState};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// General: the name is present and follows the server name rule.
pub fn general_valid(state: &WizardState) -> bool {
    is_valid_server_name(&state.general.name)
}

/// Authentication: see the per-strategy rules below.
///
/// - A server declaring no strategies needs nothing.
/// - Otherwise a declared strategy must be selected.
/// - API key needs a location and a field name.
/// - OAuth2 needs authorize and token URLs, plus either a DCR result in
///   automatic mode or, in manual mode, an auth method, a client id and a
///   secret when the method is a `client_secret_*` one.
pub fn authentication_valid(state: &WizardState) -> bool {
    if state.declared_auth_types.is_empty() {
        return true;
    }
    let Some(selected) = state.selected_auth_type else {
        return false;
    };
    if !state.declared_auth_types.contains(&selected) {
        return false;
    }
    match selected {
        AuthType::NoAuth => true,
        AuthType::ApiKey => {
            state.api_key.location.is_some() && !state.api_key.name.trim().is_empty()
        }
        AuthType::OAuth2 => oauth2_valid(state),
    }
}

fn oauth2_valid(state: &WizardState) -> bool {
    let form = &state.oauth2;
    if form.authorize_url.trim().is_empty() || form.access_token_url.trim().is_empty() {
        return false;
    }
    match state.registration_mode() {
        RegistrationMode::Automatic => state.dcr().is_some(),
        RegistrationMode::Manual => match form.token_endpoint_auth_method.as_deref() {
            Some(method) if !method.trim().is_empty() => {
                !form.client_id.trim().is_empty()
                    && (!requires_client_secret(method) || !form.client_secret.trim().is_empty())
            }
            _ => false,
        },
    }
}

/// Type: any ownership is acceptable.
pub fn type_valid(_state: &WizardState) -> bool {
    true
}

/// Tools: all tools, or at least one picked.
pub fn tools_valid(state: &WizardState) -> bool {
    state.tool_policy.is_satisfied()
}

/// Teams and operational account: a team is required only when mandatory.
pub fn teams_valid(state: &WizardState) -> bool {
    !state.teams_mandatory || !state.selected_teams.is_empty()
}

fn step(id: StepId) -> StepSpec<WizardState> {
    match id {
        StepId::General => StepSpec {
            id,
            label: "General",
            validate: general_valid,
        },
        StepId::Authentication => StepSpec {
            id,
            label: "Authentication",
            validate: authentication_valid,
        },
        StepId::Type => StepSpec {
            id,
            label: "Type",
            validate: type_valid,
        },
        StepId::Tools => StepSpec {
            id,
            label: "Tools",
            validate: tools_valid,
        },
        StepId::Teams => StepSpec {
            id,
            label: "Teams",
            validate: teams_valid,
        },
        StepId::OperationalAccount => StepSpec {
            id,
            label: "Operational Account",
            validate: teams_valid,
        },
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// A product surface hosting the wizard, each with its own step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Surface {
    /// Register a new resource server
    ServerRegistration,
    /// Configure an existing resource server
    Configuration,
    /// Register a server and configure it in one pass
    FullOnboarding,
    /// Configure the platform's operational account for a server
    OperationalAccount,
}

impl Surface {
    /// Every surface.
    pub const ALL: [Surface; 4] = [
        Surface::ServerRegistration,
        Surface::Configuration,
        Surface::FullOnboarding,
        Surface::OperationalAccount,
    ];

    /// Kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::ServerRegistration => "server-registration",
            Surface::Configuration => "configuration",
            Surface::FullOnboarding => "full-onboarding",
            Surface::OperationalAccount => "operational-account",
        }
    }

    /// Step ids in order.
    pub fn step_ids(&self) -> &'static [StepId] {
        match self {
            Surface::ServerRegistration => &[
                StepId::General,
                StepId::Authentication,
                StepId::OperationalAccount,
            ],
            Surface::Configuration => &[
                StepId::Authentication,
                StepId::Type,
                StepId::Tools,
                StepId::Teams,
            ],
            Surface::FullOnboarding => &[
                StepId::General,
                StepId::Authentication,
                StepId::Type,
                StepId::Tools,
                StepId::Teams,
            ],
            Surface::OperationalAccount => &[
                StepId::Authentication,
                StepId::Tools,
                StepId::OperationalAccount,
            ],
        }
    }

    /// Step specs in order.
    pub fn steps(&self) -> Vec<StepSpec<WizardState>> {
        self.step_ids().iter().copied().map(step).collect()
    }

    /// Capabilities the actor needs to open this surface.
    pub fn required_capabilities(&self) -> &'static [Capability] {
        match self {
            Surface::ServerRegistration => &[Capability::ManageResourceServers],
            Surface::Configuration | Surface::OperationalAccount => {
                &[Capability::ManageConfigurations]
            }
            Surface::FullOnboarding => &[
                Capability::ManageResourceServers,
                Capability::ManageConfigurations,
            ],
        }
    }

    /// Whether the surface registers a new server.
    pub fn creates_server(&self) -> bool {
        matches!(self, Surface::ServerRegistration | Surface::FullOnboarding)
    }

    /// Whether the surface creates a configuration.
    pub fn creates_configuration(&self) -> bool {
        !matches!(self, Surface::ServerRegistration)
    }

    /// Whether a team must be selected.
    pub fn teams_mandatory(&self) -> bool {
        matches!(self, Surface::OperationalAccount)
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Surface {
    type Err = OnboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        Surface::ALL
            .into_iter()
            .find(|surface| surface.as_str() == normalized)
            .ok_or_else(|| {
                OnboardError::Wizard(format!(
                    "unknown surface '{s}', expected one of: server-registration, configuration, full-onboarding, operational-account"
                ))
            })
    }
}
