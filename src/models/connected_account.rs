//! Connected accounts: provisioned credential instances
//!
//! Secrets only travel outbound. Any credential value returned by the
//! backend is masked while deserializing, so no read path in this crate ever
//! holds a full API key.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::auth_config::AuthType;
use crate::models::configuration::Ownership;

/// Number of trailing characters left visible by [`mask_secret`].
const VISIBLE_SUFFIX: usize = 4;

/// Masks a secret for display.
///
/// Keeps at most the last four characters; anything of four characters or
/// fewer is masked entirely.
///
/// # Examples
///
/// ```
/// use mcp_onboard::models::mask_secret;
///
/// assert_eq!(mask_secret("sk-live-123456"), "**********3456");
/// assert_eq!(mask_secret("abcd"), "****");
/// ```
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= VISIBLE_SUFFIX {
        return "*".repeat(chars.len());
    }
    let hidden = chars.len() - VISIBLE_SUFFIX;
    let mut out = "*".repeat(hidden);
    out.extend(&chars[hidden..]);
    out
}

/// An API key on its way to the backend.
///
/// `Debug` and `Display` only ever print the masked form. Serialization
/// writes the raw value, which is why this type appears only in create
/// bodies.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeySecret(String);

impl ApiKeySecret {
    /// Wraps a raw key.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw key.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the key is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Masked form suitable for display.
    pub fn masked(&self) -> String {
        mask_secret(&self.0)
    }
}

impl fmt::Debug for ApiKeySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKeySecret({})", self.masked())
    }
}

impl fmt::Display for ApiKeySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl Serialize for ApiKeySecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

fn deserialize_masked<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|s| mask_secret(&s)))
}

/// A provisioned connected account as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedAccount {
    /// Stable identifier
    pub id: String,
    /// Configuration this account belongs to
    pub mcp_server_configuration_id: String,
    /// Owning user; `None` for shared and operational accounts
    #[serde(default)]
    pub user_id: Option<String>,
    /// Ownership copied from the configuration at creation time
    pub ownership: Ownership,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Last time the account was used to call the server
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    /// Masked API key, when the backend echoes one
    #[serde(
        default,
        alias = "api_key",
        deserialize_with = "deserialize_masked",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key_masked: Option<String>,
}

impl ConnectedAccount {
    /// Returns `true` when `user_id` owns this account.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// Create body for `POST /connected-accounts`.
#[derive(Debug, Clone, Serialize)]
pub struct NewConnectedAccount {
    /// Configuration to provision an account for
    pub mcp_server_configuration_id: String,
    /// Strategy of the configuration
    pub auth_type: AuthType,
    /// Key for API-key configurations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKeySecret>,
    /// Where the backend sends the browser after the OAuth2 callback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url_after_account_creation: Option<String>,
}

/// Response of `POST /connected-accounts`.
///
/// The OAuth2 variant carries an authorization URL; no account exists yet.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CreateAccountResponse {
    /// OAuth2: the browser must be sent here
    AuthorizationUrl {
        /// Opaque URL, followed verbatim
        authorization_url: String,
    },
    /// No-auth or API-key: the account was created
    Account(ConnectedAccount),
}
