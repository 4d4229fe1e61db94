//! Local well-known endpoint probe used by [`DiscoveryMode::Direct`]
//!
//! # Probe sequence
//!
//! 1. Fetch the RFC 9728 protected resource metadata from
//!    `/.well-known/oauth-protected-resource<path>` of the resource server.
//! 2. Take its first authorization server as the issuer. When the document
//!    is missing, the resource server's own origin is used as the issuer.
//! 3. Try the five RFC 8414 / OpenID Connect Discovery orderings for the
//!    issuer and map the first document found to [`OAuth2Metadata`].
//!
//! [`DiscoveryMode::Direct`]: super::discovery::DiscoveryMode::Direct

use serde::Deserialize;
use url::Url;

use crate::error::{OnboardError, Result};
use crate::oauth2::discovery::OAuth2Metadata;

/// RFC 9728 protected resource metadata (fields this crate reads).
#[derive(Debug, Clone, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// The protected resource URI
    pub resource: String,
    /// Issuers protecting the resource
    #[serde(default)]
    pub authorization_servers: Vec<String>,
}

/// RFC 8414 / OIDC authorization server metadata (fields this crate reads).
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationServerMetadata {
    /// Issuer identifier
    #[serde(default)]
    pub issuer: Option<String>,
    /// Authorization endpoint
    #[serde(default)]
    pub authorization_endpoint: Option<String>,
    /// Token endpoint
    #[serde(default)]
    pub token_endpoint: Option<String>,
    /// Dynamic Client Registration endpoint
    #[serde(default)]
    pub registration_endpoint: Option<String>,
    /// Supported token endpoint client authentication methods
    #[serde(default)]
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
}

impl From<AuthorizationServerMetadata> for OAuth2Metadata {
    fn from(meta: AuthorizationServerMetadata) -> Self {
        // An omitted method list stays omitted: automatic registration is
        // only offered for methods the server actually advertised.
        let methods = meta
            .token_endpoint_auth_methods_supported
            .filter(|m| !m.is_empty());
        OAuth2Metadata {
            authorize_url: meta.authorization_endpoint,
            refresh_token_url: meta.token_endpoint.clone(),
            access_token_url: meta.token_endpoint,
            registration_url: meta.registration_endpoint,
            token_endpoint_auth_method_supported: methods,
        }
    }
}

/// Runs the full probe for `resource_url`.
///
/// # Errors
///
/// Returns [`OnboardError::Discovery`] when no authorization server metadata
/// document can be found.
pub async fn probe(http: &reqwest::Client, resource_url: &Url) -> Result<OAuth2Metadata> {
    let issuer = match fetch_protected_resource_metadata(http, resource_url).await {
        Ok(meta) => match meta.authorization_servers.first() {
            Some(issuer) => Url::parse(issuer)?,
            None => origin_of(resource_url)?,
        },
        Err(e) => {
            tracing::debug!(error = %e, "protected resource metadata unavailable, using origin");
            origin_of(resource_url)?
        }
    };

    let meta = fetch_authorization_server_metadata(http, &issuer).await?;
    Ok(meta.into())
}

fn origin_of(url: &Url) -> Result<Url> {
    Ok(Url::parse(&url.origin().ascii_serialization())?)
}

/// Fetches `/.well-known/oauth-protected-resource<path>` for `resource_url`.
pub async fn fetch_protected_resource_metadata(
    http: &reqwest::Client,
    resource_url: &Url,
) -> Result<ProtectedResourceMetadata> {
    let path = resource_url.path();
    let well_known_path = if path == "/" || path.is_empty() {
        "/.well-known/oauth-protected-resource".to_string()
    } else {
        format!("/.well-known/oauth-protected-resource{}", path)
    };

    let mut well_known_url = resource_url.clone();
    well_known_url.set_path(&well_known_path);
    well_known_url.set_query(None);
    well_known_url.set_fragment(None);

    let resp = http
        .get(well_known_url)
        .send()
        .await
        .map_err(|e| OnboardError::Discovery(format!("well-known metadata fetch failed: {e}")))?;

    if !resp.status().is_success() {
        return Err(OnboardError::Discovery(format!(
            "protected resource metadata not found for {}",
            resource_url
        ))
        .into());
    }

    let meta = resp.json().await.map_err(|e| {
        OnboardError::Discovery(format!("failed to parse protected resource metadata: {e}"))
    })?;
    Ok(meta)
}

/// Candidate metadata URLs for `issuer`, in the order they are tried.
///
/// 1. `/.well-known/oauth-authorization-server<path>`
/// 2. `/.well-known/openid-configuration<path>`
/// 3. `<issuer>/.well-known/openid-configuration`
/// 4. `/.well-known/oauth-authorization-server`
/// 5. `/.well-known/openid-configuration`
fn candidate_urls(issuer: &Url) -> Vec<Url> {
    let path = issuer.path().trim_end_matches('/').to_string();
    let origin = issuer.origin().ascii_serialization();

    let mut candidates: Vec<Url> = [
        format!("{origin}/.well-known/oauth-authorization-server{path}"),
        format!("{origin}/.well-known/openid-configuration{path}"),
    ]
    .iter()
    .filter_map(|s| Url::parse(s).ok())
    .collect();

    let mut appended = issuer.clone();
    appended.set_path(&format!("{path}/.well-known/openid-configuration"));
    appended.set_query(None);
    appended.set_fragment(None);
    candidates.push(appended);

    candidates.extend(
        [
            format!("{origin}/.well-known/oauth-authorization-server"),
            format!("{origin}/.well-known/openid-configuration"),
        ]
        .iter()
        .filter_map(|s| Url::parse(s).ok()),
    );

    // Root issuers produce the same URL more than once.
    let mut seen = std::collections::HashSet::new();
    candidates.retain(|u| seen.insert(u.as_str().to_string()));
    candidates
}

/// Fetches the first authorization server metadata document that resolves.
pub async fn fetch_authorization_server_metadata(
    http: &reqwest::Client,
    issuer: &Url,
) -> Result<AuthorizationServerMetadata> {
    for candidate in candidate_urls(issuer) {
        let resp = match http.get(candidate.clone()).send().await {
            Ok(r) => r,
            Err(_) => continue,
        };

        if resp.status().is_success() {
            if let Ok(meta) = resp.json::<AuthorizationServerMetadata>().await {
                tracing::debug!(url = %candidate, "authorization server metadata found");
                return Ok(meta);
            }
        }
    }

    Err(OnboardError::Discovery(format!(
        "authorization server metadata not found for issuer {}",
        issuer
    ))
    .into())
}
