//! Error types for mcp-onboard
//!
//! This module defines all error types used throughout the onboarding
//! workflow, using `thiserror` for ergonomic error handling.
//!
//! The variants follow the categories the workflow distinguishes: client-side
//! validation (never sent to the backend), discovery and registration
//! failures, provisioning failures, permission denials, and backend
//! rejections. None of them trigger automatic retries.

use thiserror::Error;

/// Main error type for mcp-onboard operations
///
/// Functions return [`Result`], which wraps this enum in `anyhow::Error`.
/// Callers that need to branch on the category recover it with
/// `err.downcast_ref::<OnboardError>()`.
#[derive(Error, Debug)]
pub enum OnboardError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Client-side validation failure, caught before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The acting user lacks a capability required for the action
    #[error("Permission denied: missing capability '{capability}'")]
    PermissionDenied {
        /// Name of the missing capability
        capability: String,
    },

    /// Auth type missing or not one of the supported strategies
    #[error("Unknown auth type: {0}")]
    UnknownAuthType(String),

    /// OAuth2 metadata discovery failed
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Dynamic Client Registration failed
    #[error("Client registration error: {0}")]
    Registration(String),

    /// Connected account creation was rejected
    #[error("Provisioning error: {0}")]
    Provisioning(String),

    /// Non-success response from the control plane
    #[error("Backend error (HTTP {status}): {message}")]
    Backend {
        /// HTTP status code returned by the control plane
        status: u16,
        /// Human-readable message extracted from the response body
        message: String,
    },

    /// A DCR result no longer matches the server URL it was issued for
    #[error("Stale client registration: {0}")]
    StaleRegistration(String),

    /// Tool re-sync attempted inside the cooldown window
    #[error("Tool sync is cooling down: retry in {remaining_secs}s")]
    SyncCooldown {
        /// Seconds left until the next sync is permitted
        remaining_secs: i64,
    },

    /// Wizard navigation refused (invalid step, pending call, unknown step)
    #[error("Wizard error: {0}")]
    Wizard(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for mcp-onboard operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

/// Returns the [`OnboardError`] carried by `err`, if any.
pub fn classify(err: &anyhow::Error) -> Option<&OnboardError> {
    err.downcast_ref::<OnboardError>()
}
