use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use url::Url;

use mcp_onboard::control_plane::{ControlPlane, ControlPlaneClientConfig, HttpControlPlane};
use mcp_onboard::permissions::Role;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// HTTP control plane pointed at a mock server.
#[allow(dead_code)]
pub fn control_plane(base_url: &str, role: Role) -> Arc<dyn ControlPlane> {
    let client = HttpControlPlane::new(ControlPlaneClientConfig {
        base_url: Url::parse(base_url).expect("mock server URL is valid"),
        access_token: Some("test-token".to_string()),
        org_id: Some("org_test".to_string()),
        act_as: role,
        timeout: Duration::from_secs(5),
    })
    .expect("client builds");
    Arc::new(client)
}
