//! Control plane abstraction and implementations
//!
//! This module defines the [`ControlPlane`] trait, one method per backend
//! endpoint the onboarding workflow calls. Concrete implementations live in
//! submodules:
//!
//! - [`http::HttpControlPlane`] -- JSON over HTTPS with bearer auth and
//!   organization metadata headers.
//! - [`fake::FakeControlPlane`] -- in-process fake with canned responses and
//!   a call log (cfg(test) only).
//!
//! Implementations never retry. Non-success responses surface as
//! [`crate::error::OnboardError::Backend`].

use url::Url;

use crate::error::Result;
use crate::models::{
    Bundle, Configuration, ConfigurationQuery, ConnectedAccount, CreateAccountResponse,
    NewBundle, NewConfiguration, NewConnectedAccount, NewResourceServer, Page, ResourceServer,
    Team, ToolRefreshSummary,
};
use crate::oauth2::discovery::OAuth2Metadata;
use crate::oauth2::registration::{DcrRequest, DcrResponse};

/// Backend operations used by onboarding.
///
/// Used polymorphically through `Arc<dyn ControlPlane>`.
#[async_trait::async_trait]
pub trait ControlPlane: Send + Sync + std::fmt::Debug {
    /// `POST /mcp-servers/oauth2-discovery`
    async fn discover_oauth2(&self, server_url: &Url) -> Result<OAuth2Metadata>;

    /// `POST /mcp-servers/oauth2-dcr`
    async fn register_oauth2_client(&self, request: &DcrRequest) -> Result<DcrResponse>;

    /// `POST /mcp-servers`
    async fn create_resource_server(&self, server: &NewResourceServer) -> Result<ResourceServer>;

    /// `GET /mcp-servers/{id}`
    async fn get_resource_server(&self, server_id: &str) -> Result<ResourceServer>;

    /// `POST /mcp-servers/{id}/refresh-tools`
    async fn refresh_tools(&self, server_id: &str) -> Result<ToolRefreshSummary>;

    /// `POST /mcp-server-configurations`
    async fn create_configuration(&self, configuration: &NewConfiguration)
        -> Result<Configuration>;

    /// `GET /mcp-server-configurations`
    async fn list_configurations(&self, query: &ConfigurationQuery) -> Result<Page<Configuration>>;

    /// `POST /connected-accounts`
    async fn create_connected_account(
        &self,
        account: &NewConnectedAccount,
    ) -> Result<CreateAccountResponse>;

    /// `GET /connected-accounts`, optionally filtered by configuration
    async fn list_connected_accounts(
        &self,
        configuration_id: Option<&str>,
    ) -> Result<Vec<ConnectedAccount>>;

    /// `GET /teams`
    async fn list_teams(&self) -> Result<Vec<Team>>;

    /// `POST /mcp-server-bundles`
    async fn create_bundle(&self, bundle: &NewBundle) -> Result<Bundle>;
}

pub mod http;

#[cfg(test)]
pub mod fake;

pub use http::{ControlPlaneClientConfig, HttpControlPlane};
