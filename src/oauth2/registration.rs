//! OAuth2 Dynamic Client Registration (RFC 7591) through the control plane
//!
//! Registration is only attempted when discovery produced both a
//! registration endpoint and a non-empty list of supported token endpoint
//! auth methods. [`AutomaticRegistration::from_metadata`] is the one place
//! that rule lives; the wizard asks it on every evaluation instead of
//! remembering an earlier answer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::control_plane::ControlPlane;
use crate::error::{OnboardError, Result};
use crate::oauth2::discovery::OAuth2Metadata;

// ---------------------------------------------------------------------------
// AutomaticRegistration
// ---------------------------------------------------------------------------

/// Inputs for an automatic registration, present only when DCR is possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomaticRegistration {
    /// Registration endpoint of the authorization server
    pub registration_url: String,
    /// Token endpoint auth methods the server accepts
    pub auth_methods: Vec<String>,
}

impl AutomaticRegistration {
    /// Derives registration inputs from discovered metadata.
    ///
    /// Returns `Some` iff the registration URL is non-empty and at least one
    /// non-empty auth method is listed.
    ///
    /// # Examples
    ///
    /// ```
    /// use mcp_onboard::oauth2::discovery::OAuth2Metadata;
    /// use mcp_onboard::oauth2::registration::AutomaticRegistration;
    ///
    /// let meta = OAuth2Metadata {
    ///     registration_url: Some("https://auth.example.com/register".to_string()),
    ///     token_endpoint_auth_method_supported: Some(vec![]),
    ///     ..Default::default()
    /// };
    /// assert!(AutomaticRegistration::from_metadata(&meta).is_none());
    /// ```
    pub fn from_metadata(meta: &OAuth2Metadata) -> Option<Self> {
        let registration_url = meta
            .registration_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;

        let auth_methods: Vec<String> = meta
            .token_endpoint_auth_method_supported
            .as_ref()?
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();

        if auth_methods.is_empty() {
            return None;
        }

        Some(Self {
            registration_url: registration_url.to_string(),
            auth_methods,
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Body of `POST /mcp-servers/oauth2-dcr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcrRequest {
    /// Resource server the client is registered for
    pub mcp_server_url: String,
    /// Registration endpoint to call
    pub registration_url: String,
    /// Auth methods the authorization server advertised
    pub token_endpoint_auth_method_supported: Vec<String>,
}

/// Response of `POST /mcp-servers/oauth2-dcr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcrResponse {
    /// Issued client identifier
    pub client_id: String,
    /// Issued secret; absent for public clients
    #[serde(default)]
    pub client_secret: Option<String>,
    /// The single method the server enforces for this client
    pub token_endpoint_auth_method: String,
}

// ---------------------------------------------------------------------------
// DcrResult
// ---------------------------------------------------------------------------

/// Issued client credentials plus the discovery input they belong to.
#[derive(Clone, PartialEq, Eq)]
pub struct DcrResult {
    /// Issued client identifier
    pub client_id: String,
    /// Issued secret, if any
    pub client_secret: Option<String>,
    /// Method enforced at the token endpoint
    pub token_endpoint_auth_method: String,
    /// Server URL that was discovered and registered against
    pub issued_for: Url,
    /// Registration endpoint that issued the client
    pub registration_url: String,
}

impl DcrResult {
    /// Returns `true` when this result was issued for `server_url`.
    pub fn is_current_for(&self, server_url: &Url) -> bool {
        &self.issued_for == server_url
    }
}

impl std::fmt::Debug for DcrResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DcrResult")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_deref().map(crate::models::mask_secret),
            )
            .field("token_endpoint_auth_method", &self.token_endpoint_auth_method)
            .field("issued_for", &self.issued_for.as_str())
            .field("registration_url", &self.registration_url)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// DynamicClientRegistrar
// ---------------------------------------------------------------------------

/// Performs DCR via the control plane.
#[derive(Debug, Clone)]
pub struct DynamicClientRegistrar {
    control_plane: Arc<dyn ControlPlane>,
}

impl DynamicClientRegistrar {
    /// Creates a registrar backed by `control_plane`.
    pub fn new(control_plane: Arc<dyn ControlPlane>) -> Self {
        Self { control_plane }
    }

    /// Registers a client for `server_url`.
    ///
    /// # Errors
    ///
    /// Any failure, including a backend rejection, is returned as
    /// [`OnboardError::Registration`]. There is no fallback; the caller
    /// retries or switches to manual entry.
    pub async fn register(
        &self,
        server_url: &Url,
        registration: &AutomaticRegistration,
    ) -> Result<DcrResult> {
        let request = DcrRequest {
            mcp_server_url: server_url.to_string(),
            registration_url: registration.registration_url.clone(),
            token_endpoint_auth_method_supported: registration.auth_methods.clone(),
        };

        tracing::debug!(
            server_url = %server_url,
            registration_url = %registration.registration_url,
            "registering OAuth2 client"
        );

        let response = self
            .control_plane
            .register_oauth2_client(&request)
            .await
            .map_err(|e| {
                let message = match e.downcast_ref::<OnboardError>() {
                    Some(OnboardError::Backend { message, .. }) => message.clone(),
                    _ => e.to_string(),
                };
                tracing::warn!(server_url = %server_url, error = %message, "client registration failed");
                OnboardError::Registration(message)
            })?;

        if response.client_id.trim().is_empty() {
            return Err(
                OnboardError::Registration("registration returned no client_id".to_string()).into(),
            );
        }

        tracing::info!(
            server_url = %server_url,
            auth_method = %response.token_endpoint_auth_method,
            "OAuth2 client registered"
        );

        Ok(DcrResult {
            client_id: response.client_id,
            client_secret: response.client_secret.filter(|s| !s.is_empty()),
            token_endpoint_auth_method: response.token_endpoint_auth_method,
            issued_for: server_url.clone(),
            registration_url: registration.registration_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::fake::FakeControlPlane;

    fn meta(registration: Option<&str>, methods: Option<Vec<&str>>) -> OAuth2Metadata {
        OAuth2Metadata {
            authorize_url: Some("https://auth.example.com/authorize".to_string()),
            access_token_url: Some("https://auth.example.com/token".to_string()),
            registration_url: registration.map(str::to_string),
            token_endpoint_auth_method_supported: methods
                .map(|m| m.into_iter().map(str::to_string).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_automatic_available_only_with_url_and_methods() {
        assert!(AutomaticRegistration::from_metadata(&meta(
            Some("https://auth.example.com/register"),
            Some(vec!["none"])
        ))
        .is_some());
        assert!(AutomaticRegistration::from_metadata(&meta(None, Some(vec!["none"]))).is_none());
        assert!(AutomaticRegistration::from_metadata(&meta(Some(""), Some(vec!["none"]))).is_none());
        assert!(
            AutomaticRegistration::from_metadata(&meta(Some("https://r"), None)).is_none()
        );
        assert!(
            AutomaticRegistration::from_metadata(&meta(Some("https://r"), Some(vec![" "])))
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_register_records_issuing_server_url() {
        let fake = Arc::new(FakeControlPlane::new());
        fake.set_dcr(Ok(DcrResponse {
            client_id: "client_123".to_string(),
            client_secret: Some("s3cret".to_string()),
            token_endpoint_auth_method: "client_secret_post".to_string(),
        }));
        let registrar = DynamicClientRegistrar::new(fake.clone());
        let url = Url::parse("https://mcp.example.com/mcp").unwrap();
        let registration = AutomaticRegistration {
            registration_url: "https://auth.example.com/register".to_string(),
            auth_methods: vec!["client_secret_post".to_string()],
        };

        let result = registrar.register(&url, &registration).await.unwrap();
        assert_eq!(result.client_id, "client_123");
        assert!(result.is_current_for(&url));
        assert!(!result.is_current_for(&Url::parse("https://other.example.com").unwrap()));
        assert!(!format!("{result:?}").contains("s3cret"));
        assert_eq!(fake.calls(), vec!["register_oauth2_client".to_string()]);
    }

    #[tokio::test]
    async fn test_register_failure_is_registration_error() {
        let fake = Arc::new(FakeControlPlane::new());
        fake.set_dcr(Err((400, "registration endpoint refused".to_string())));
        let registrar = DynamicClientRegistrar::new(fake);
        let url = Url::parse("https://mcp.example.com/mcp").unwrap();
        let registration = AutomaticRegistration {
            registration_url: "https://auth.example.com/register".to_string(),
            auth_methods: vec!["none".to_string()],
        };

        let err = registrar.register(&url, &registration).await.unwrap_err();
        match err.downcast_ref::<OnboardError>() {
            Some(OnboardError::Registration(msg)) => {
                assert_eq!(msg, "registration endpoint refused")
            }
            other => panic!("expected Registration, got {other:?}"),
        }
    }
}
