//! Authentication strategies attached to a resource server
//!
//! A resource server declares the list of [`AuthConfig`] variants it accepts;
//! each configuration selects exactly one of them. The variant set is closed:
//! adding a strategy means adding an [`AuthType`] variant, and every
//! exhaustive `match` on it (provisioning, wizard validation) must follow.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OnboardError;

// ---------------------------------------------------------------------------
// AuthType
// ---------------------------------------------------------------------------

/// Tag identifying one of the three authentication strategies.
///
/// # Examples
///
/// ```
/// use mcp_onboard::models::AuthType;
///
/// let parsed: AuthType = "api_key".parse().unwrap();
/// assert_eq!(parsed, AuthType::ApiKey);
/// assert!("basic".parse::<AuthType>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// No credentials are injected into requests
    NoAuth,
    /// A static API key injected at a fixed location
    ApiKey,
    /// OAuth2 authorization code flow
    #[serde(rename = "oauth2")]
    OAuth2,
}

impl AuthType {
    /// Wire representation used by the control plane.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::NoAuth => "no_auth",
            AuthType::ApiKey => "api_key",
            AuthType::OAuth2 => "oauth2",
        }
    }

    /// Human-readable label for terminal output.
    pub fn label(&self) -> &'static str {
        match self {
            AuthType::NoAuth => "No Auth",
            AuthType::ApiKey => "API Key",
            AuthType::OAuth2 => "OAuth2",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = OnboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "no_auth" => Ok(AuthType::NoAuth),
            "api_key" => Ok(AuthType::ApiKey),
            "oauth2" => Ok(AuthType::OAuth2),
            other => Err(OnboardError::UnknownAuthType(if other.is_empty() {
                "<empty>".to_string()
            } else {
                other.to_string()
            })),
        }
    }
}

// ---------------------------------------------------------------------------
// KeyLocation
// ---------------------------------------------------------------------------

/// Where a credential is injected into an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLocation {
    /// Substituted into the request path
    Path,
    /// Appended as a query parameter
    Query,
    /// Sent as a request header
    Header,
    /// Sent as a cookie
    Cookie,
    /// Placed in the request body
    Body,
}

impl FromStr for KeyLocation {
    type Err = OnboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "path" => Ok(KeyLocation::Path),
            "query" => Ok(KeyLocation::Query),
            "header" => Ok(KeyLocation::Header),
            "cookie" => Ok(KeyLocation::Cookie),
            "body" => Ok(KeyLocation::Body),
            other => Err(OnboardError::Validation(format!(
                "invalid key location '{other}', expected one of: path, query, header, cookie, body"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// AuthConfig
// ---------------------------------------------------------------------------

/// One authentication strategy with its parameters.
///
/// Serialized with an internal `type` tag matching [`AuthType::as_str`].
///
/// # Examples
///
/// ```
/// use mcp_onboard::models::{AuthConfig, KeyLocation};
///
/// let config = AuthConfig::ApiKey {
///     location: KeyLocation::Header,
///     name: "X-Subscription-Token".to_string(),
///     prefix: None,
/// };
/// let json = serde_json::to_value(&config).unwrap();
/// assert_eq!(json["type"], "api_key");
/// assert!(json.get("prefix").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthConfig {
    /// No credentials
    #[serde(rename = "no_auth")]
    NoAuth,

    /// Static API key
    #[serde(rename = "api_key")]
    ApiKey {
        /// Injection location
        location: KeyLocation,
        /// Header, query, cookie or field name carrying the key
        name: String,
        /// Optional value prefix (e.g. `"Bearer"`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },

    /// OAuth2 authorization code flow
    #[serde(rename = "oauth2")]
    OAuth2(OAuth2Config),
}

impl AuthConfig {
    /// Returns the tag of this strategy.
    pub fn auth_type(&self) -> AuthType {
        match self {
            AuthConfig::NoAuth => AuthType::NoAuth,
            AuthConfig::ApiKey { .. } => AuthType::ApiKey,
            AuthConfig::OAuth2(_) => AuthType::OAuth2,
        }
    }
}

/// Parameters of an OAuth2 strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Config {
    /// Authorization endpoint
    pub authorize_url: String,
    /// Token endpoint
    pub access_token_url: String,
    /// Refresh endpoint, when different from the token endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_url: Option<String>,
    /// Injection location of the access token
    #[serde(default = "default_oauth2_location")]
    pub location: KeyLocation,
    /// Header or parameter name carrying the access token
    #[serde(default = "default_oauth2_name")]
    pub name: String,
    /// Token prefix
    #[serde(default = "default_oauth2_prefix")]
    pub prefix: String,
    /// OAuth2 client identifier
    pub client_id: String,
    /// Client secret; absent for public clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    /// Token endpoint client authentication method
    pub token_endpoint_auth_method: String,
    /// Space-separated scopes to request
    #[serde(default)]
    pub scope: String,
}

fn default_oauth2_location() -> KeyLocation {
    KeyLocation::Header
}

fn default_oauth2_name() -> String {
    "Authorization".to_string()
}

fn default_oauth2_prefix() -> String {
    "Bearer".to_string()
}

/// Returns `true` when `token_endpoint_auth_method` requires a client secret.
///
/// # Examples
///
/// ```
/// use mcp_onboard::models::requires_client_secret;
///
/// assert!(requires_client_secret("client_secret_basic"));
/// assert!(requires_client_secret("client_secret_post"));
/// assert!(!requires_client_secret("none"));
/// assert!(!requires_client_secret("private_key_jwt"));
/// ```
pub fn requires_client_secret(token_endpoint_auth_method: &str) -> bool {
    token_endpoint_auth_method.contains("client_secret_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_type_wire_strings() {
        assert_eq!(AuthType::NoAuth.as_str(), "no_auth");
        assert_eq!(AuthType::ApiKey.as_str(), "api_key");
        assert_eq!(AuthType::OAuth2.as_str(), "oauth2");
        assert_eq!(
            serde_json::to_value(AuthType::OAuth2).unwrap(),
            serde_json::json!("oauth2")
        );
    }

    #[test]
    fn test_auth_type_parse_rejects_unknown_and_empty() {
        let err = "".parse::<AuthType>().unwrap_err();
        assert!(matches!(err, OnboardError::UnknownAuthType(_)));
        let err = "bearer".parse::<AuthType>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown auth type: bearer");
    }

    #[test]
    fn test_api_key_without_prefix_serializes_without_prefix_field() {
        let config = AuthConfig::ApiKey {
            location: KeyLocation::Header,
            name: "X-Subscription-Token".to_string(),
            prefix: None,
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "api_key",
                "location": "header",
                "name": "X-Subscription-Token"
            })
        );
    }

    #[test]
    fn test_oauth2_defaults_fill_injection_fields() {
        let json = r#"{
            "type": "oauth2",
            "authorize_url": "https://auth.example.com/authorize",
            "access_token_url": "https://auth.example.com/token",
            "client_id": "abc",
            "token_endpoint_auth_method": "none"
        }"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        match config {
            AuthConfig::OAuth2(oauth) => {
                assert_eq!(oauth.location, KeyLocation::Header);
                assert_eq!(oauth.name, "Authorization");
                assert_eq!(oauth.prefix, "Bearer");
                assert!(oauth.client_secret.is_none());
            }
            other => panic!("expected oauth2, got {other:?}"),
        }
    }

    #[test]
    fn test_auth_config_reports_its_type() {
        assert_eq!(AuthConfig::NoAuth.auth_type(), AuthType::NoAuth);
    }

    #[test]
    fn test_key_location_parse() {
        assert_eq!("Header".parse::<KeyLocation>().unwrap(), KeyLocation::Header);
        assert!("footer".parse::<KeyLocation>().is_err());
    }

    #[test]
    fn test_requires_client_secret_matches_substring_only() {
        assert!(requires_client_secret("client_secret_jwt"));
        assert!(!requires_client_secret("client_secret"));
        assert!(!requires_client_secret(""));
    }
}
