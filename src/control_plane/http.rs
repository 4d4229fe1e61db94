//! JSON-over-HTTPS control plane client
//!
//! Every request carries:
//!
//! - `Authorization: Bearer <token>` when an access token is configured
//! - `X-Org-Id` with the active organization, when set
//! - `X-Act-As-Role` with the role the user acts as
//! - `X-Request-Id`, a fresh UUID v4 per call, for log correlation
//!
//! Non-success responses are mapped to [`OnboardError::Backend`] with the
//! most human-readable message the body offers.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
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
use crate::permissions::Role;

/// Header carrying the active organization.
pub const ORG_ID_HEADER: &str = "X-Org-Id";
/// Header carrying the role the user acts as.
pub const ACT_AS_HEADER: &str = "X-Act-As-Role";
/// Header carrying the per-call correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Body fields checked, in order, for a backend error message.
const MESSAGE_FIELDS: [&str; 4] = ["message", "detail", "error_description", "error"];

/// Connection settings for [`HttpControlPlane`].
#[derive(Debug, Clone)]
pub struct ControlPlaneClientConfig {
    /// Base URL, e.g. `https://api.example.com/v1`
    pub base_url: Url,
    /// Bearer token
    pub access_token: Option<String>,
    /// Active organization
    pub org_id: Option<String>,
    /// Role sent as the act-as header
    pub act_as: Role,
    /// Per-request timeout
    pub timeout: Duration,
}

/// [`ControlPlane`] over HTTP.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use url::Url;
/// use mcp_onboard::control_plane::{ControlPlaneClientConfig, HttpControlPlane};
/// use mcp_onboard::permissions::Role;
///
/// let client = HttpControlPlane::new(ControlPlaneClientConfig {
///     base_url: Url::parse("https://api.example.com/v1").unwrap(),
///     access_token: None,
///     org_id: Some("org_1".to_string()),
///     act_as: Role::Member,
///     timeout: Duration::from_secs(30),
/// })
/// .unwrap();
/// assert_eq!(
///     client.endpoint("/mcp-servers"),
///     "https://api.example.com/v1/mcp-servers"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    http: reqwest::Client,
    config: ControlPlaneClientConfig,
}

/// List endpoints answer either with a bare array or a page envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Page(Page<T>),
    Items(Vec<T>),
}

impl<T> From<ListBody<T>> for Page<T> {
    fn from(body: ListBody<T>) -> Self {
        match body {
            ListBody::Page(page) => page,
            ListBody::Items(data) => Page {
                data,
                offset: 0,
                total: None,
            },
        }
    }
}

#[derive(Serialize)]
struct DiscoveryRequest<'a> {
    mcp_server_url: &'a str,
}

impl HttpControlPlane {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Http`] when the TLS backend cannot be
    /// initialised.
    pub fn new(config: ControlPlaneClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(OnboardError::Http)?;
        Ok(Self { http, config })
    }

    /// Absolute URL for `path` under the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(%method, path, %request_id, "control plane request");

        let mut builder = self
            .http
            .request(method, self.endpoint(path))
            .header(REQUEST_ID_HEADER, request_id)
            .header(ACT_AS_HEADER, self.config.act_as.as_str());
        if let Some(token) = &self.config.access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(org) = &self.config.org_id {
            builder = builder.header(ORG_ID_HEADER, org);
        }
        builder
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let resp = builder.send().await.map_err(OnboardError::Http)?;
        let resp = check_status(resp).await?;
        let body = resp.json::<T>().await.map_err(OnboardError::Http)?;
        Ok(body)
    }
}

/// Maps a non-success response to [`OnboardError::Backend`].
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = extract_message(&text).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    tracing::debug!(status = status.as_u16(), %message, "control plane rejected request");
    Err(OnboardError::Backend {
        status: status.as_u16(),
        message,
    }
    .into())
}

/// Finds a human-readable message in an error body.
///
/// Looks for the first string-valued field among `message`, `detail`,
/// `error_description` and `error`. A non-JSON body is used verbatim.
pub fn extract_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(value) => MESSAGE_FIELDS
            .iter()
            .filter_map(|field| value.get(field).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(str::to_string),
        Err(_) => Some(trimmed.to_string()),
    }
}

#[async_trait::async_trait]
impl ControlPlane for HttpControlPlane {
    async fn discover_oauth2(&self, server_url: &Url) -> Result<OAuth2Metadata> {
        let body = DiscoveryRequest {
            mcp_server_url: server_url.as_str(),
        };
        self.send(
            self.request(Method::POST, "/mcp-servers/oauth2-discovery")
                .json(&body),
        )
        .await
    }

    async fn register_oauth2_client(&self, request: &DcrRequest) -> Result<DcrResponse> {
        self.send(self.request(Method::POST, "/mcp-servers/oauth2-dcr").json(request))
            .await
    }

    async fn create_resource_server(&self, server: &NewResourceServer) -> Result<ResourceServer> {
        self.send(self.request(Method::POST, "/mcp-servers").json(server))
            .await
    }

    async fn get_resource_server(&self, server_id: &str) -> Result<ResourceServer> {
        self.send(self.request(Method::GET, &format!("/mcp-servers/{server_id}")))
            .await
    }

    async fn refresh_tools(&self, server_id: &str) -> Result<ToolRefreshSummary> {
        self.send(self.request(
            Method::POST,
            &format!("/mcp-servers/{server_id}/refresh-tools"),
        ))
        .await
    }

    async fn create_configuration(
        &self,
        configuration: &NewConfiguration,
    ) -> Result<Configuration> {
        self.send(
            self.request(Method::POST, "/mcp-server-configurations")
                .json(configuration),
        )
        .await
    }

    async fn list_configurations(&self, query: &ConfigurationQuery) -> Result<Page<Configuration>> {
        let body: ListBody<Configuration> = self
            .send(self.request(Method::GET, "/mcp-server-configurations").query(query))
            .await?;
        Ok(body.into())
    }

    async fn create_connected_account(
        &self,
        account: &NewConnectedAccount,
    ) -> Result<CreateAccountResponse> {
        self.send(self.request(Method::POST, "/connected-accounts").json(account))
            .await
    }

    async fn list_connected_accounts(
        &self,
        configuration_id: Option<&str>,
    ) -> Result<Vec<ConnectedAccount>> {
        let mut builder = self.request(Method::GET, "/connected-accounts");
        if let Some(id) = configuration_id {
            builder = builder.query(&[("mcp_server_configuration_id", id)]);
        }
        let body: ListBody<ConnectedAccount> = self.send(builder).await?;
        Ok(Page::from(body).data)
    }

    async fn list_teams(&self) -> Result<Vec<Team>> {
        let body: ListBody<Team> = self.send(self.request(Method::GET, "/teams")).await?;
        Ok(Page::from(body).data)
    }

    async fn create_bundle(&self, bundle: &NewBundle) -> Result<Bundle> {
        self.send(self.request(Method::POST, "/mcp-server-bundles").json(bundle))
            .await
    }
}
