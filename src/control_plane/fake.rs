//! In-process fake control plane for unit tests
//!
//! [`FakeControlPlane`] answers every [`ControlPlane`] call from canned
//! responses and appends the method name to a call log, so tests can assert
//! both what came back and how many network calls were made.
//!
//! Create calls echo their request into a stored record with a generated id
//! (`srv_1`, `cfg_1`, `bundle_1`, ...) unless a failure was configured.

use std::sync::Mutex;

use url::Url;

use crate::control_plane::ControlPlane;
use crate::error::{OnboardError, Result};
use crate::models::{
    Bundle, Configuration, ConfigurationQuery, ConnectedAccount, CreateAccountResponse,
    NewBundle, NewConfiguration, NewConnectedAccount, NewResourceServer, Page, ResourceServer,
    Team, ToolRefreshSummary,
};
use crate::oauth2::discovery::OAuth2Metadata;
use crate::oauth2::registration::{DcrRequest, DcrResponse};

/// A backend rejection: HTTP status and message.
pub type Rejection = (u16, String);

#[derive(Debug, Default)]
struct State {
    calls: Vec<String>,
    discovery: Option<OAuth2Metadata>,
    dcr: Option<std::result::Result<DcrResponse, Rejection>>,
    dcr_requests: Vec<DcrRequest>,
    servers: Vec<ResourceServer>,
    server_failure: Option<Rejection>,
    refresh: Option<std::result::Result<ToolRefreshSummary, Rejection>>,
    configurations: Vec<Configuration>,
    configuration_failure: Option<Rejection>,
    omit_page_offset: bool,
    new_configurations: Vec<NewConfiguration>,
    create_account: Option<std::result::Result<CreateAccountResponse, Rejection>>,
    new_accounts: Vec<NewConnectedAccount>,
    accounts: Vec<ConnectedAccount>,
    teams: Vec<Team>,
    bundles: Vec<Bundle>,
    next_id: u32,
}

/// Canned-response [`ControlPlane`].
#[derive(Debug, Default)]
pub struct FakeControlPlane {
    state: Mutex<State>,
}

fn rejected(rejection: &Rejection) -> anyhow::Error {
    OnboardError::Backend {
        status: rejection.0,
        message: rejection.1.clone(),
    }
    .into()
}

impl FakeControlPlane {
    /// Creates a fake with no canned data.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    fn record(&self, call: &str) {
        self.with_state(|s| s.calls.push(call.to_string()));
    }

    /// Method names called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.with_state(|s| s.calls.clone())
    }

    /// Number of calls to `method`.
    pub fn call_count(&self, method: &str) -> usize {
        self.with_state(|s| s.calls.iter().filter(|c| *c == method).count())
    }

    /// Discovery answer; `None` makes discovery fail with a 404.
    pub fn set_discovery(&self, meta: Option<OAuth2Metadata>) {
        self.with_state(|s| s.discovery = meta);
    }

    /// DCR answer.
    pub fn set_dcr(&self, result: std::result::Result<DcrResponse, Rejection>) {
        self.with_state(|s| s.dcr = Some(result));
    }

    /// DCR requests received.
    pub fn dcr_requests(&self) -> Vec<DcrRequest> {
        self.with_state(|s| s.dcr_requests.clone())
    }

    /// Adds a server returned by `get_resource_server`.
    pub fn add_server(&self, server: ResourceServer) {
        self.with_state(|s| s.servers.push(server));
    }

    /// Makes `create_resource_server` fail.
    pub fn fail_server_creation(&self, rejection: Rejection) {
        self.with_state(|s| s.server_failure = Some(rejection));
    }

    /// Servers created or added so far.
    pub fn servers(&self) -> Vec<ResourceServer> {
        self.with_state(|s| s.servers.clone())
    }

    /// Refresh answer.
    pub fn set_refresh(&self, result: std::result::Result<ToolRefreshSummary, Rejection>) {
        self.with_state(|s| s.refresh = Some(result));
    }

    /// Adds a configuration returned by `list_configurations`.
    pub fn add_configuration(&self, configuration: Configuration) {
        self.with_state(|s| s.configurations.push(configuration));
    }

    /// Reports every configuration page with offset 0, like a backend that
    /// leaves the field out.
    pub fn omit_page_offset(&self) {
        self.with_state(|s| s.omit_page_offset = true);
    }

    /// Makes `create_configuration` fail.
    pub fn fail_configuration_creation(&self, rejection: Rejection) {
        self.with_state(|s| s.configuration_failure = Some(rejection));
    }

    /// Lets create calls succeed again after `fail_*_creation`.
    pub fn clear_failures(&self) {
        self.with_state(|s| {
            s.server_failure = None;
            s.configuration_failure = None;
        });
    }

    /// Create bodies received by `create_configuration`.
    pub fn new_configurations(&self) -> Vec<NewConfiguration> {
        self.with_state(|s| s.new_configurations.clone())
    }

    /// Answer for `create_connected_account`.
    pub fn set_create_account(
        &self,
        result: std::result::Result<CreateAccountResponse, Rejection>,
    ) {
        self.with_state(|s| s.create_account = Some(result));
    }

    /// Create bodies received by `create_connected_account`.
    pub fn new_accounts(&self) -> Vec<NewConnectedAccount> {
        self.with_state(|s| s.new_accounts.clone())
    }

    /// Adds an account returned by `list_connected_accounts`.
    pub fn add_account(&self, account: ConnectedAccount) {
        self.with_state(|s| s.accounts.push(account));
    }

    /// Replaces the team list.
    pub fn set_teams(&self, teams: Vec<Team>) {
        self.with_state(|s| s.teams = teams);
    }

    /// Bundles created so far.
    pub fn bundles(&self) -> Vec<Bundle> {
        self.with_state(|s| s.bundles.clone())
    }
}

#[async_trait::async_trait]
impl ControlPlane for FakeControlPlane {
    async fn discover_oauth2(&self, _server_url: &Url) -> Result<OAuth2Metadata> {
        self.record("discover_oauth2");
        self.with_state(|s| s.discovery.clone())
            .ok_or_else(|| rejected(&(404, "no metadata".to_string())))
    }

    async fn register_oauth2_client(&self, request: &DcrRequest) -> Result<DcrResponse> {
        self.record("register_oauth2_client");
        self.with_state(|s| {
            s.dcr_requests.push(request.clone());
            match &s.dcr {
                Some(Ok(resp)) => Ok(resp.clone()),
                Some(Err(rejection)) => Err(rejected(rejection)),
                None => Err(rejected(&(500, "no DCR response configured".to_string()))),
            }
        })
    }

    async fn create_resource_server(&self, server: &NewResourceServer) -> Result<ResourceServer> {
        self.record("create_resource_server");
        self.with_state(|s| {
            if let Some(rejection) = &s.server_failure {
                return Err(rejected(rejection));
            }
            s.next_id += 1;
            let created = ResourceServer {
                id: format!("srv_{}", s.next_id),
                name: server.name.clone(),
                url: server.url.clone(),
                description: server.description.clone(),
                logo: server.logo.clone(),
                categories: server.categories.clone(),
                tools: vec![],
                auth_configs: server.auth_configs.clone(),
                last_synced_at: None,
            };
            s.servers.push(created.clone());
            Ok(created)
        })
    }

    async fn get_resource_server(&self, server_id: &str) -> Result<ResourceServer> {
        self.record("get_resource_server");
        self.with_state(|s| {
            s.servers
                .iter()
                .find(|srv| srv.id == server_id)
                .cloned()
                .ok_or_else(|| rejected(&(404, format!("server {server_id} not found"))))
        })
    }

    async fn refresh_tools(&self, _server_id: &str) -> Result<ToolRefreshSummary> {
        self.record("refresh_tools");
        self.with_state(|s| match &s.refresh {
            Some(Ok(summary)) => Ok(summary.clone()),
            Some(Err(rejection)) => Err(rejected(rejection)),
            None => Ok(ToolRefreshSummary::default()),
        })
    }

    async fn create_configuration(
        &self,
        configuration: &NewConfiguration,
    ) -> Result<Configuration> {
        self.record("create_configuration");
        self.with_state(|s| {
            s.new_configurations.push(configuration.clone());
            if let Some(rejection) = &s.configuration_failure {
                return Err(rejected(rejection));
            }
            s.next_id += 1;
            let created = Configuration {
                id: format!("cfg_{}", s.next_id),
                mcp_server_id: configuration.mcp_server_id.clone(),
                name: String::new(),
                auth_type: configuration.auth_type,
                ownership: configuration.ownership,
                all_tools_enabled: configuration.all_tools_enabled,
                enabled_tools: configuration.enabled_tools.clone(),
                allowed_teams: configuration.allowed_teams.clone(),
                created_at: None,
            };
            s.configurations.push(created.clone());
            Ok(created)
        })
    }

    async fn list_configurations(&self, query: &ConfigurationQuery) -> Result<Page<Configuration>> {
        self.record("list_configurations");
        self.with_state(|s| {
            let matching: Vec<Configuration> = s
                .configurations
                .iter()
                .filter(|c| query.ownership.map_or(true, |o| c.ownership == o))
                .cloned()
                .collect();
            let offset = query.offset.unwrap_or(0);
            let data = matching
                .iter()
                .skip(offset as usize)
                .take(query.limit.map_or(usize::MAX, |l| l as usize))
                .cloned()
                .collect();
            Ok(Page {
                total: Some(matching.len() as u32),
                data,
                offset: if s.omit_page_offset { 0 } else { offset },
            })
        })
    }

    async fn create_connected_account(
        &self,
        account: &NewConnectedAccount,
    ) -> Result<CreateAccountResponse> {
        self.record("create_connected_account");
        self.with_state(|s| {
            s.new_accounts.push(account.clone());
            match &s.create_account {
                Some(Ok(resp)) => Ok(resp.clone()),
                Some(Err(rejection)) => Err(rejected(rejection)),
                None => Err(rejected(&(500, String::new()))),
            }
        })
    }

    async fn list_connected_accounts(
        &self,
        configuration_id: Option<&str>,
    ) -> Result<Vec<ConnectedAccount>> {
        self.record("list_connected_accounts");
        self.with_state(|s| {
            Ok(s.accounts
                .iter()
                .filter(|a| configuration_id.map_or(true, |id| a.mcp_server_configuration_id == id))
                .cloned()
                .collect())
        })
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        self.record("list_teams");
        self.with_state(|s| Ok(s.teams.clone()))
    }

    async fn create_bundle(&self, bundle: &NewBundle) -> Result<Bundle> {
        self.record("create_bundle");
        self.with_state(|s| {
            s.next_id += 1;
            let created = Bundle {
                id: format!("bundle_{}", s.next_id),
                name: bundle.name.clone(),
                user_id: None,
                bundle_key: format!("key_{}", s.next_id),
                mcp_server_configuration_ids: bundle.mcp_server_configuration_ids.clone(),
            };
            s.bundles.push(created.clone());
            Ok(created)
        })
    }
}
