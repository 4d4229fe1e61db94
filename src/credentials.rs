//! Control-plane access token storage
//!
//! Tokens live in the OS keyring as JSON under the service
//! [`KEYRING_SERVICE`], keyed by the control-plane host. The
//! `MCP_ONBOARD_ACCESS_TOKEN` environment variable, when set and non-blank,
//! takes precedence over anything stored.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OnboardError, Result};

/// Keyring service name.
pub const KEYRING_SERVICE: &str = "mcp-onboard";

/// Environment variable overriding the stored token.
pub const ACCESS_TOKEN_ENV: &str = "MCP_ONBOARD_ACCESS_TOKEN";

/// Tokens this close to expiry count as expired.
const EXPIRY_BUFFER_SECS: i64 = 30;

/// A stored control-plane token.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredToken {
    /// Bearer token
    pub access_token: String,
    /// Expiry, if the issuer reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl StoredToken {
    /// Creates a token that expires `expires_in_secs` from now, if given.
    pub fn new(access_token: impl Into<String>, expires_in_secs: Option<i64>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: expires_in_secs.map(|s| Utc::now() + Duration::seconds(s)),
        }
    }

    /// `true` when the token is past, or within a short buffer of, its expiry.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// [`Self::is_expired`] against an explicit clock.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_BUFFER_SECS) >= expires_at,
            None => false,
        }
    }
}

/// Keyring-backed token store for one control plane.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    account: String,
}

impl CredentialStore {
    /// Creates a store for the control plane at `control_plane_url`.
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use mcp_onboard::credentials::CredentialStore;
    ///
    /// let store = CredentialStore::for_control_plane(
    ///     &Url::parse("https://api.example.com:8443/v1").unwrap(),
    /// );
    /// assert_eq!(store.account(), "api.example.com:8443");
    /// ```
    pub fn for_control_plane(control_plane_url: &Url) -> Self {
        let host = control_plane_url.host_str().unwrap_or("localhost");
        let account = match control_plane_url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Self { account }
    }

    /// Keyring account name.
    pub fn account(&self) -> &str {
        &self.account
    }

    fn entry(&self) -> Result<keyring::Entry> {
        Ok(keyring::Entry::new(KEYRING_SERVICE, &self.account).map_err(OnboardError::Keyring)?)
    }

    /// Saves `token`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Keyring`] if the credential store is
    /// unavailable.
    pub fn save(&self, token: &StoredToken) -> Result<()> {
        let json = serde_json::to_string(token).map_err(OnboardError::Serialization)?;
        self.entry()?
            .set_password(&json)
            .map_err(OnboardError::Keyring)?;
        tracing::debug!(account = %self.account, "access token stored");
        Ok(())
    }

    /// Loads the stored token, `Ok(None)` when nothing is stored.
    pub fn load(&self) -> Result<Option<StoredToken>> {
        match self.entry()?.get_password() {
            Ok(json) => {
                let token = serde_json::from_str(&json).map_err(OnboardError::Serialization)?;
                Ok(Some(token))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(OnboardError::Keyring(e).into()),
        }
    }

    /// Deletes the stored token. Deleting nothing is not an error.
    pub fn delete(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(OnboardError::Keyring(e).into()),
        }
    }

    /// Resolves the token to send: the environment override, else a stored
    /// unexpired token.
    ///
    /// Keyring failures are logged and treated as "no token" so commands
    /// that do not need one still run.
    pub fn resolve(&self) -> Option<String> {
        if let Some(token) = token_from_env() {
            return Some(token);
        }
        match self.load() {
            Ok(Some(token)) if token.is_expired() => {
                tracing::warn!(account = %self.account, "stored access token has expired, run `login` again");
                None
            }
            Ok(Some(token)) => Some(token.access_token),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "could not read the credential store");
                None
            }
        }
    }
}

/// Non-blank `MCP_ONBOARD_ACCESS_TOKEN`.
pub fn token_from_env() -> Option<String> {
    std::env::var(ACCESS_TOKEN_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
