//! Non-interactive wizard input
//!
//! A [`WizardAnswers`] YAML document supplies, per step, what a user would
//! type. [`WizardAnswers::run`] walks a session from its current step to the
//! commit, applying the answers for each step before calling `next()`. Any
//! refusal (incomplete step, failed registration, backend rejection) stops
//! the run with that error.
//!
//! ```yaml
//! server_id: srv_123            # configuration surfaces only
//! general:
//!   name: BRAVE_SEARCH
//!   url: https://brave.example.com/mcp
//! auth:
//!   type: oauth2
//!   registration: automatic
//!   oauth2:
//!     scope: "read write"
//! ownership: shared
//! tools:
//!   all: false
//!   enabled: [web_search]
//! teams: [team_eng]
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OnboardError, Result};
use crate::models::{AuthType, KeyLocation, Ownership};
use crate::wizard::engine::StepId;
use crate::wizard::session::{Advance, CommitReceipt, WizardSession};
use crate::wizard::state::RegistrationMode;

/// General step answers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralAnswers {
    /// Server name
    pub name: String,
    /// Server URL
    pub url: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Logo URL
    #[serde(default)]
    pub logo: Option<String>,
    /// Categories
    #[serde(default)]
    pub categories: Vec<String>,
}

/// OAuth2 form answers. Blank fields keep discovered values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OAuth2Answers {
    /// Authorization endpoint
    #[serde(default)]
    pub authorize_url: Option<String>,
    /// Token endpoint
    #[serde(default)]
    pub access_token_url: Option<String>,
    /// Refresh endpoint
    #[serde(default)]
    pub refresh_token_url: Option<String>,
    /// Manual client id
    #[serde(default)]
    pub client_id: Option<String>,
    /// Manual client secret
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Manual auth method
    #[serde(default)]
    pub token_endpoint_auth_method: Option<String>,
    /// Scope
    #[serde(default)]
    pub scope: Option<String>,
}

/// API key answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyAnswers {
    /// Injection location
    pub location: KeyLocation,
    /// Field name
    pub name: String,
    /// Optional prefix
    #[serde(default)]
    pub prefix: Option<String>,
}

/// Authentication step answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthAnswers {
    /// Strategy
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    /// Requested OAuth2 registration mode
    #[serde(default)]
    pub registration: RegistrationMode,
    /// OAuth2 fields
    #[serde(default)]
    pub oauth2: OAuth2Answers,
    /// API key fields
    #[serde(default)]
    pub api_key: Option<ApiKeyAnswers>,
}

/// Tools step answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAnswers {
    /// Enable all tools
    #[serde(default = "default_true")]
    pub all: bool,
    /// Explicit tool names
    #[serde(default)]
    pub enabled: BTreeSet<String>,
}

fn default_true() -> bool {
    true
}

/// Answers for a whole wizard run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WizardAnswers {
    /// Existing server, for configuration surfaces
    #[serde(default)]
    pub server_id: Option<String>,
    /// General step
    #[serde(default)]
    pub general: Option<GeneralAnswers>,
    /// Authentication step
    #[serde(default)]
    pub auth: Option<AuthAnswers>,
    /// Type step
    #[serde(default)]
    pub ownership: Option<Ownership>,
    /// Tools step
    #[serde(default)]
    pub tools: Option<ToolAnswers>,
    /// Teams and operational account steps
    #[serde(default)]
    pub teams: Vec<String>,
}

fn set_if_given(field: &mut String, value: &Option<String>) {
    if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        *field = v.to_string();
    }
}

impl WizardAnswers {
    /// Parses answers from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text).map_err(OnboardError::Yaml)?)
    }

    /// Reads answers from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(OnboardError::Io)?;
        Self::from_yaml(&text)
    }

    /// Drives `session` to its commit.
    ///
    /// # Errors
    ///
    /// Returns the first refusal from the session.
    pub async fn run(&self, session: &mut WizardSession) -> Result<CommitReceipt> {
        session.start().await;
        // Every step either advances or errors, so this terminates.
        loop {
            let step = session.current();
            self.apply(step, session).await?;
            match session.next().await? {
                Advance::Moved(next) => {
                    tracing::debug!(from = %step, to = %next, "wizard advanced");
                }
                Advance::Committed(receipt) => return Ok(receipt),
            }
        }
    }

    async fn apply(&self, step: StepId, session: &mut WizardSession) -> Result<()> {
        match step {
            StepId::General => {
                let general = self.general.as_ref().ok_or_else(|| {
                    OnboardError::Validation("answers are missing the 'general' section".to_string())
                })?;
                let state = session.state_mut();
                state.general.name = general.name.trim().to_string();
                state.general.description = general.description.clone();
                state.general.logo = general.logo.clone();
                state.general.categories = general.categories.clone();
                state.set_server_url(general.url.trim());
            }
            StepId::Authentication => {
                if let Some(auth) = &self.auth {
                    self.apply_auth(auth, session).await?;
                }
            }
            StepId::Type => {
                if let Some(ownership) = self.ownership {
                    session.state_mut().ownership = ownership;
                }
            }
            StepId::Tools => {
                if let Some(tools) = &self.tools {
                    let policy = &mut session.state_mut().tool_policy;
                    policy.all_tools_enabled = tools.all;
                    policy.enabled_tools = tools.enabled.clone();
                }
            }
            StepId::Teams | StepId::OperationalAccount => {
                session.state_mut().selected_teams = self.teams.iter().cloned().collect();
            }
        }
        Ok(())
    }

    async fn apply_auth(&self, auth: &AuthAnswers, session: &mut WizardSession) -> Result<()> {
        session.state_mut().request_registration_mode(auth.registration);
        session.select_auth_type(auth.auth_type).await;

        match auth.auth_type {
            AuthType::NoAuth => {}
            AuthType::ApiKey => {
                let api_key = auth.api_key.as_ref().ok_or_else(|| {
                    OnboardError::Validation("api_key answers are required for type api_key".to_string())
                })?;
                let form = &mut session.state_mut().api_key;
                form.location = Some(api_key.location);
                form.name = api_key.name.clone();
                form.prefix = api_key.prefix.clone();
            }
            AuthType::OAuth2 => {
                let answers = &auth.oauth2;
                {
                    let form = &mut session.state_mut().oauth2;
                    set_if_given(&mut form.authorize_url, &answers.authorize_url);
                    set_if_given(&mut form.access_token_url, &answers.access_token_url);
                    set_if_given(&mut form.refresh_token_url, &answers.refresh_token_url);
                    set_if_given(&mut form.client_id, &answers.client_id);
                    set_if_given(&mut form.client_secret, &answers.client_secret);
                    set_if_given(&mut form.scope, &answers.scope);
                    if let Some(method) = answers
                        .token_endpoint_auth_method
                        .as_deref()
                        .filter(|m| !m.trim().is_empty())
                    {
                        form.token_endpoint_auth_method = Some(method.trim().to_string());
                    }
                }
                let mode = session.state().registration_mode();
                if auth.registration == RegistrationMode::Automatic && mode == RegistrationMode::Manual {
                    tracing::warn!("automatic registration unavailable, using manual credentials");
                }
                if mode == RegistrationMode::Automatic && session.state().dcr().is_none() {
                    session.register_client().await?;
                }
            }
        }
        Ok(())
    }
}
