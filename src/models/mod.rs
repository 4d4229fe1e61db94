//! Domain types shared by the wizard, provisioner and bundle checker
//!
//! These types mirror the control plane's JSON bodies. Field names follow
//! the wire format so that serde needs as few renames as possible.
//!
//! # Module Layout
//!
//! - `auth_config`       -- the three authentication strategies
//! - `resource_server`   -- registered servers, name rule, tool refresh
//! - `configuration`     -- ownership modes, tool policy, list queries
//! - `connected_account` -- provisioned credentials and secret masking
//! - `bundle`            -- configuration bundles
//! - `team`              -- teams used for visibility scoping

pub mod auth_config;
pub mod bundle;
pub mod configuration;
pub mod connected_account;
pub mod resource_server;
pub mod team;

pub use auth_config::{requires_client_secret, AuthConfig, AuthType, KeyLocation, OAuth2Config};
pub use bundle::{Bundle, NewBundle};
pub use configuration::{
    Configuration, ConfigurationQuery, NewConfiguration, Ownership, Page, ToolPolicy,
};
pub use connected_account::{
    mask_secret, ApiKeySecret, ConnectedAccount, CreateAccountResponse, NewConnectedAccount,
};
pub use resource_server::{
    is_valid_server_name, validate_server_name, NewResourceServer, ResourceServer, Tool,
    ToolRefreshSummary,
};
pub use team::Team;
