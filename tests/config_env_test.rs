//! Configuration loading with file, environment and CLI layers
//!
//! Environment variables are process-global, so every test here runs
//! serially.

use clap::Parser;
use serial_test::serial;

use mcp_onboard::cli::Cli;
use mcp_onboard::config::Config;
use mcp_onboard::oauth2::DiscoveryMode;
use mcp_onboard::permissions::Role;

mod common;

const ENV_VARS: [&str; 7] = [
    "MCP_ONBOARD_CONTROL_PLANE_URL",
    "MCP_ONBOARD_ORG_ID",
    "MCP_ONBOARD_USER_ID",
    "MCP_ONBOARD_ACT_AS",
    "MCP_ONBOARD_TIMEOUT_SECONDS",
    "MCP_ONBOARD_CALLBACK_ORIGIN",
    "MCP_ONBOARD_DISCOVERY_MODE",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

fn cli(args: &[&str]) -> Cli {
    let mut full = vec!["mcp-onboard"];
    full.extend_from_slice(args);
    Cli::parse_from(full)
}

#[test]
#[serial]
fn test_file_values_are_loaded() {
    clear_env();
    let (_dir, path) = common::temp_config_file(
        r#"
control_plane:
  url: https://api.example.com/v1
  org_id: org_file
  timeout_seconds: 12
oauth2:
  callback_origin: https://app.example.com
logging:
  json: true
"#,
    );

    let config = Config::load(path.to_str().unwrap(), &cli(&["validate-name", "X"])).unwrap();
    config.validate().unwrap();

    assert_eq!(config.control_plane.org_id.as_deref(), Some("org_file"));
    assert_eq!(config.control_plane.timeout_seconds, 12);
    assert!(config.logging.json);
    assert_eq!(
        config.callback_target().unwrap().redirect_url(None).as_str(),
        "https://app.example.com/connected-accounts/callback"
    );
}

#[test]
#[serial]
fn test_env_overrides_file_and_cli_overrides_env() {
    clear_env();
    let (_dir, path) = common::temp_config_file(
        "control_plane:\n  url: https://file.example.com\n  org_id: org_file\n",
    );

    std::env::set_var("MCP_ONBOARD_CONTROL_PLANE_URL", "https://env.example.com/v2");
    std::env::set_var("MCP_ONBOARD_ORG_ID", "org_env");
    std::env::set_var("MCP_ONBOARD_USER_ID", "user_env");
    std::env::set_var("MCP_ONBOARD_ACT_AS", "admin");
    std::env::set_var("MCP_ONBOARD_TIMEOUT_SECONDS", "45");
    std::env::set_var("MCP_ONBOARD_CALLBACK_ORIGIN", "https://console.example.com");
    std::env::set_var("MCP_ONBOARD_DISCOVERY_MODE", "direct");

    let config = Config::load(
        path.to_str().unwrap(),
        &cli(&["--org", "org_cli", "validate-name", "X"]),
    )
    .unwrap();
    clear_env();

    assert_eq!(config.control_plane.url, "https://env.example.com/v2");
    assert_eq!(config.control_plane.org_id.as_deref(), Some("org_cli"));
    assert_eq!(config.control_plane.act_as, Role::Admin);
    assert_eq!(config.control_plane.timeout_seconds, 45);
    assert_eq!(config.oauth2.callback_origin, "https://console.example.com");
    assert_eq!(config.oauth2.discovery_mode, DiscoveryMode::Direct);
    let actor = config.actor().unwrap();
    assert_eq!(actor.user_id, "user_env");
    assert_eq!(actor.org_id.as_deref(), Some("org_cli"));
}

#[test]
#[serial]
fn test_invalid_env_values_are_ignored() {
    clear_env();
    std::env::set_var("MCP_ONBOARD_ACT_AS", "superuser");
    std::env::set_var("MCP_ONBOARD_DISCOVERY_MODE", "sideways");

    let config = Config::load("/nonexistent/config.yaml", &cli(&["validate-name", "X"])).unwrap();
    clear_env();

    assert_eq!(config.control_plane.act_as, Role::Member);
    assert_eq!(config.oauth2.discovery_mode, DiscoveryMode::ControlPlane);
}

#[test]
#[serial]
fn test_client_config_uses_env_token() {
    clear_env();
    std::env::set_var("MCP_ONBOARD_ACCESS_TOKEN", "env-token");
    let config = Config::default();
    let client = config.client_config().unwrap();
    std::env::remove_var("MCP_ONBOARD_ACCESS_TOKEN");

    assert_eq!(client.access_token.as_deref(), Some("env-token"));
    assert_eq!(client.timeout.as_secs(), 30);
}

#[test]
#[serial]
fn test_actor_needs_user_id() {
    clear_env();
    let config = Config::load("/nonexistent/config.yaml", &cli(&["validate-name", "X"])).unwrap();
    let err = config.actor().unwrap_err();
    assert!(err.to_string().contains("--user"));

    let config = Config::load(
        "/nonexistent/config.yaml",
        &cli(&["--user", "usr_42", "validate-name", "X"]),
    )
    .unwrap();
    assert_eq!(config.actor().unwrap().user_id, "usr_42");
}
