//! Best-effort OAuth2 metadata discovery for a resource server
//!
//! Discovery asks the control plane to resolve the authorization server
//! metadata behind a resource server URL. Every field of the result is
//! independently optional, and failure is never fatal: callers fall back to
//! manual entry when the outcome is [`DiscoveryOutcome::Unavailable`].
//!
//! In [`DiscoveryMode::Direct`] the probe runs locally against the server's
//! well-known endpoints instead (see [`super::well_known`]).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::control_plane::ControlPlane;
use crate::oauth2::well_known;

// ---------------------------------------------------------------------------
// OAuth2Metadata
// ---------------------------------------------------------------------------

/// Partial authorization-server metadata returned by discovery.
///
/// # Examples
///
/// ```
/// use mcp_onboard::oauth2::discovery::OAuth2Metadata;
///
/// let json = r#"{
///     "authorize_url": "https://auth.example.com/authorize",
///     "access_token_url": "https://auth.example.com/token"
/// }"#;
/// let meta: OAuth2Metadata = serde_json::from_str(json).unwrap();
/// assert!(meta.registration_url.is_none());
/// assert!(!meta.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Metadata {
    /// Authorization endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorize_url: Option<String>,

    /// Token endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_url: Option<String>,

    /// Refresh endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_url: Option<String>,

    /// Dynamic Client Registration endpoint (RFC 7591)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_url: Option<String>,

    /// Token endpoint client authentication methods the server accepts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_method_supported: Option<Vec<String>>,
}

impl OAuth2Metadata {
    /// Returns `true` when no field carries a non-empty value.
    pub fn is_empty(&self) -> bool {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.authorize_url)
            && blank(&self.access_token_url)
            && blank(&self.refresh_token_url)
            && blank(&self.registration_url)
            && self
                .token_endpoint_auth_method_supported
                .as_ref()
                .map_or(true, Vec::is_empty)
    }
}

// ---------------------------------------------------------------------------
// DiscoveryOutcome
// ---------------------------------------------------------------------------

/// Result of one discovery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// At least one metadata field was found
    Found(OAuth2Metadata),
    /// Nothing usable was found; the caller switches to manual entry
    Unavailable {
        /// Why discovery came back empty
        reason: String,
    },
}

impl DiscoveryOutcome {
    /// The discovered metadata, if any.
    pub fn metadata(&self) -> Option<&OAuth2Metadata> {
        match self {
            DiscoveryOutcome::Found(meta) => Some(meta),
            DiscoveryOutcome::Unavailable { .. } => None,
        }
    }

    fn from_metadata(meta: OAuth2Metadata) -> Self {
        if meta.is_empty() {
            DiscoveryOutcome::Unavailable {
                reason: "no OAuth2 metadata found".to_string(),
            }
        } else {
            DiscoveryOutcome::Found(meta)
        }
    }
}

/// Where the discovery probe runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Ask the control plane to probe the server
    #[default]
    ControlPlane,
    /// Probe the server's well-known endpoints from this process
    Direct,
}

impl std::str::FromStr for DiscoveryMode {
    type Err = crate::error::OnboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "control_plane" | "control-plane" => Ok(DiscoveryMode::ControlPlane),
            "direct" => Ok(DiscoveryMode::Direct),
            other => Err(crate::error::OnboardError::Config(format!(
                "invalid discovery mode '{other}', expected control_plane or direct"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// OAuth2DiscoveryClient
// ---------------------------------------------------------------------------

/// Runs discovery probes. One call per invocation, no automatic retries.
#[derive(Debug, Clone)]
pub struct OAuth2DiscoveryClient {
    control_plane: Arc<dyn ControlPlane>,
    http: reqwest::Client,
    mode: DiscoveryMode,
}

impl OAuth2DiscoveryClient {
    /// Creates a client probing through the control plane.
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self {
            control_plane,
            http: reqwest::Client::new(),
            mode: DiscoveryMode::ControlPlane,
        }
    }

    /// Switches the probe location.
    pub fn with_mode(mut self, mode: DiscoveryMode, http: reqwest::Client) -> Self {
        self.mode = mode;
        self.http = http;
        self
    }

    /// Current probe location.
    pub fn mode(&self) -> DiscoveryMode {
        self.mode
    }

    /// Probes `server_url` for OAuth2 metadata.
    ///
    /// Never fails: network errors, backend rejections and empty records all
    /// become [`DiscoveryOutcome::Unavailable`].
    pub async fn discover(&self, server_url: &Url) -> DiscoveryOutcome {
        let result = match self.mode {
            DiscoveryMode::ControlPlane => self.control_plane.discover_oauth2(server_url).await,
            DiscoveryMode::Direct => well_known::probe(&self.http, server_url).await,
        };

        match result {
            Ok(meta) => {
                let outcome = DiscoveryOutcome::from_metadata(meta);
                match &outcome {
                    DiscoveryOutcome::Found(meta) => tracing::info!(
                        server_url = %server_url,
                        has_registration = meta.registration_url.is_some(),
                        "OAuth2 discovery succeeded"
                    ),
                    DiscoveryOutcome::Unavailable { reason } => {
                        tracing::warn!(server_url = %server_url, %reason, "OAuth2 discovery empty")
                    }
                }
                outcome
            }
            Err(e) => {
                tracing::warn!(server_url = %server_url, error = %e, "OAuth2 discovery failed, manual entry required");
                DiscoveryOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::fake::FakeControlPlane;

    fn server_url() -> Url {
        Url::parse("https://mcp.example.com/mcp").unwrap()
    }

    #[test]
    fn test_metadata_is_empty_ignores_blank_strings() {
        let meta = OAuth2Metadata {
            authorize_url: Some("  ".to_string()),
            token_endpoint_auth_method_supported: Some(vec![]),
            ..Default::default()
        };
        assert!(meta.is_empty());
    }

    #[tokio::test]
    async fn test_discover_returns_found_metadata() {
        let fake = Arc::new(FakeControlPlane::new());
        fake.set_discovery(Some(OAuth2Metadata {
            authorize_url: Some("https://auth.example.com/authorize".to_string()),
            access_token_url: Some("https://auth.example.com/token".to_string()),
            ..Default::default()
        }));
        let client = OAuth2DiscoveryClient::new(fake.clone());

        let outcome = client.discover(&server_url()).await;
        let meta = outcome.metadata().expect("metadata");
        assert_eq!(
            meta.access_token_url.as_deref(),
            Some("https://auth.example.com/token")
        );
        assert_eq!(fake.calls(), vec!["discover_oauth2".to_string()]);
    }

    #[tokio::test]
    async fn test_discover_failure_degrades_to_unavailable() {
        let fake = Arc::new(FakeControlPlane::new());
        fake.set_discovery(None);
        let client = OAuth2DiscoveryClient::new(fake.clone());

        let outcome = client.discover(&server_url()).await;
        assert!(matches!(outcome, DiscoveryOutcome::Unavailable { .. }));
        // One probe, no retries.
        assert_eq!(fake.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_discover_empty_record_is_unavailable() {
        let fake = Arc::new(FakeControlPlane::new());
        fake.set_discovery(Some(OAuth2Metadata::default()));
        let client = OAuth2DiscoveryClient::new(fake);

        let outcome = client.discover(&server_url()).await;
        assert!(outcome.metadata().is_none());
    }

    #[test]
    fn test_discovery_mode_parse() {
        assert_eq!(
            "direct".parse::<DiscoveryMode>().unwrap(),
            DiscoveryMode::Direct
        );
        assert_eq!(
            "control-plane".parse::<DiscoveryMode>().unwrap(),
            DiscoveryMode::ControlPlane
        );
        assert!("magic".parse::<DiscoveryMode>().is_err());
    }
}
