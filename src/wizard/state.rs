//! Step-local state of one wizard run
//!
//! [`WizardState`] is a plain value owned by a single session. Fields whose
//! changes must ripple elsewhere (server URL, discovery result, DCR result,
//! requested registration mode) are private and changed through methods.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{
    AuthConfig, AuthType, KeyLocation, OAuth2Config, Ownership, ResourceServer, Team, ToolPolicy,
};
use crate::oauth2::discovery::DiscoveryOutcome;
use crate::oauth2::registration::{AutomaticRegistration, DcrResult};

/// How OAuth2 client credentials are obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    /// Dynamic Client Registration
    #[default]
    Automatic,
    /// Credentials typed in by the user
    Manual,
}

/// General step fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneralInfo {
    /// Server name
    pub name: String,
    /// Description
    pub description: String,
    /// Logo URL
    pub logo: Option<String>,
    /// Category labels
    pub categories: Vec<String>,
}

/// OAuth2 form fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuth2Form {
    /// Authorization endpoint
    pub authorize_url: String,
    /// Token endpoint
    pub access_token_url: String,
    /// Refresh endpoint, blank when unused
    pub refresh_token_url: String,
    /// Manual client id
    pub client_id: String,
    /// Manual client secret
    pub client_secret: String,
    /// Manually chosen token endpoint auth method
    pub token_endpoint_auth_method: Option<String>,
    /// Requested scope
    pub scope: String,
    /// Token injection location
    pub location: KeyLocation,
    /// Token injection field name
    pub name: String,
    /// Token prefix
    pub prefix: String,
}

impl Default for OAuth2Form {
    fn default() -> Self {
        Self {
            authorize_url: String::new(),
            access_token_url: String::new(),
            refresh_token_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            token_endpoint_auth_method: None,
            scope: String::new(),
            location: KeyLocation::Header,
            name: "Authorization".to_string(),
            prefix: "Bearer".to_string(),
        }
    }
}

/// API-key form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeyForm {
    /// Injection location
    pub location: Option<KeyLocation>,
    /// Header, query or field name
    pub name: String,
    /// Optional value prefix
    pub prefix: Option<String>,
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

/// Everything the wizard collects.
#[derive(Debug, Clone, Default)]
pub struct WizardState {
    /// General step
    pub general: GeneralInfo,
    server_url: String,
    /// Strategies the server declares
    pub declared_auth_types: Vec<AuthType>,
    /// Strategy chosen by the user
    pub selected_auth_type: Option<AuthType>,
    /// OAuth2 form
    pub oauth2: OAuth2Form,
    /// API-key form
    pub api_key: ApiKeyForm,
    requested_mode: RegistrationMode,
    discovery: Option<DiscoveryOutcome>,
    dcr: Option<DcrResult>,
    /// Ownership mode
    pub ownership: Ownership,
    /// Tool policy
    pub tool_policy: ToolPolicy,
    /// Tool names the server offers
    pub available_tools: Vec<String>,
    /// Teams selected for scoping
    pub selected_teams: BTreeSet<String>,
    /// Teams the user may pick from
    pub available_teams: Vec<Team>,
    /// Whether at least one team must be chosen
    pub teams_mandatory: bool,
    /// Existing server the configuration binds, if any
    pub server_id: Option<String>,
}

impl WizardState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// State for configuring an already registered server.
    pub fn for_server(server: &ResourceServer) -> Self {
        let mut state = Self {
            general: GeneralInfo {
                name: server.name.clone(),
                description: server.description.clone(),
                logo: server.logo.clone(),
                categories: server.categories.clone(),
            },
            server_url: server.url.clone(),
            declared_auth_types: server.supported_auth_types(),
            available_tools: server.tools.iter().map(|t| t.name.clone()).collect(),
            server_id: Some(server.id.clone()),
            ..Self::default()
        };
        if let [only] = state.declared_auth_types.as_slice() {
            state.selected_auth_type = Some(*only);
        }
        if let Some(AuthConfig::OAuth2(cfg)) = server.auth_config(AuthType::OAuth2) {
            state.oauth2.authorize_url = cfg.authorize_url.clone();
            state.oauth2.access_token_url = cfg.access_token_url.clone();
            state.oauth2.refresh_token_url = cfg.refresh_token_url.clone().unwrap_or_default();
        }
        state
    }

    /// Raw server URL as entered.
    pub fn server_url_raw(&self) -> &str {
        &self.server_url
    }

    /// Parsed server URL, `None` when blank or malformed.
    pub fn server_url(&self) -> Option<Url> {
        Url::parse(self.server_url.trim()).ok()
    }

    /// Sets the server URL. A different URL invalidates discovery and DCR.
    pub fn set_server_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        if url.trim() != self.server_url.trim() {
            if self.discovery.is_some() || self.dcr.is_some() {
                tracing::debug!("server URL changed, dropping discovery and registration results");
            }
            self.discovery = None;
            self.dcr = None;
        }
        self.server_url = url;
    }

    /// Selects a strategy.
    pub fn select_auth_type(&mut self, auth_type: AuthType) {
        self.selected_auth_type = Some(auth_type);
    }

    /// Latest discovery outcome.
    pub fn discovery(&self) -> Option<&DiscoveryOutcome> {
        self.discovery.as_ref()
    }

    /// Stores a discovery outcome, filling blank OAuth2 endpoint fields from it.
    pub fn set_discovery(&mut self, outcome: DiscoveryOutcome) {
        if let Some(meta) = outcome.metadata() {
            let fill = |field: &mut String, value: &Option<String>| {
                if field.trim().is_empty() {
                    if let Some(v) = value.as_deref().and_then(non_blank) {
                        *field = v;
                    }
                }
            };
            fill(&mut self.oauth2.authorize_url, &meta.authorize_url);
            fill(&mut self.oauth2.access_token_url, &meta.access_token_url);
            fill(&mut self.oauth2.refresh_token_url, &meta.refresh_token_url);
        }
        self.discovery = Some(outcome);
    }

    /// DCR inputs derived from the current discovery result.
    pub fn automatic_registration(&self) -> Option<AutomaticRegistration> {
        self.discovery
            .as_ref()
            .and_then(DiscoveryOutcome::metadata)
            .and_then(AutomaticRegistration::from_metadata)
    }

    /// Records the mode the user asked for.
    pub fn request_registration_mode(&mut self, mode: RegistrationMode) {
        self.requested_mode = mode;
    }

    /// Effective mode: `Manual` whenever automatic registration is unavailable.
    pub fn registration_mode(&self) -> RegistrationMode {
        match self.requested_mode {
            RegistrationMode::Automatic if self.automatic_registration().is_some() => {
                RegistrationMode::Automatic
            }
            _ => RegistrationMode::Manual,
        }
    }

    /// Latest DCR result.
    pub fn dcr(&self) -> Option<&DcrResult> {
        self.dcr.as_ref()
    }

    /// Stores a DCR result.
    pub fn set_dcr(&mut self, result: DcrResult) {
        self.dcr = Some(result);
    }

    /// Drops the DCR result.
    pub fn clear_dcr(&mut self) {
        self.dcr = None;
    }

    /// Returns `true` when OAuth2 in automatic mode is selected and the DCR
    /// result was not issued for the current server URL.
    pub fn has_stale_dcr(&self) -> bool {
        if self.selected_auth_type != Some(AuthType::OAuth2)
            || self.registration_mode() != RegistrationMode::Automatic
        {
            return false;
        }
        match (self.dcr.as_ref(), self.server_url()) {
            (Some(dcr), Some(url)) => !dcr.is_current_for(&url),
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    /// Builds the auth config for the selected strategy.
    ///
    /// In automatic OAuth2 mode client credentials come from the DCR result,
    /// otherwise from the manual form.
    pub fn build_auth_config(&self) -> Option<AuthConfig> {
        match self.selected_auth_type? {
            AuthType::NoAuth => Some(AuthConfig::NoAuth),
            AuthType::ApiKey => Some(AuthConfig::ApiKey {
                location: self.api_key.location?,
                name: self.api_key.name.trim().to_string(),
                prefix: self.api_key.prefix.as_deref().and_then(non_blank),
            }),
            AuthType::OAuth2 => {
                let form = &self.oauth2;
                let (client_id, client_secret, method) = match self.registration_mode() {
                    RegistrationMode::Automatic => {
                        let dcr = self.dcr.as_ref()?;
                        (
                            dcr.client_id.clone(),
                            dcr.client_secret.clone(),
                            dcr.token_endpoint_auth_method.clone(),
                        )
                    }
                    RegistrationMode::Manual => (
                        form.client_id.trim().to_string(),
                        non_blank(&form.client_secret),
                        form.token_endpoint_auth_method.clone()?,
                    ),
                };
                Some(AuthConfig::OAuth2(OAuth2Config {
                    authorize_url: form.authorize_url.trim().to_string(),
                    access_token_url: form.access_token_url.trim().to_string(),
                    refresh_token_url: non_blank(&form.refresh_token_url),
                    location: form.location,
                    name: form.name.clone(),
                    prefix: form.prefix.clone(),
                    client_id,
                    client_secret,
                    token_endpoint_auth_method: method,
                    scope: form.scope.trim().to_string(),
                }))
            }
        }
    }
}
