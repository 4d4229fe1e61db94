//! HttpControlPlane integration tests using wiremock
//!
//! Verifies request headers, query encoding, list envelope handling and the
//! mapping of non-success responses to `OnboardError::Backend`.

use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mcp_onboard::models::{ConfigurationQuery, NewBundle, Ownership};
use mcp_onboard::permissions::Role;
use mcp_onboard::OnboardError;

mod common;

fn configuration_json(id: &str, ownership: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "mcp_server_id": "srv_1",
        "name": "GITHUB",
        "auth_type": "oauth2",
        "connected_account_ownership": ownership,
        "all_tools_enabled": true,
        "enabled_tools": [],
        "allowed_teams": []
    })
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_requests_carry_org_role_token_and_request_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/teams"))
        .and(header("X-Org-Id", "org_test"))
        .and(header("X-Act-As-Role", "admin"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header_exists("X-Request-Id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "team_eng", "name": "Engineering" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let cp = common::control_plane(&server.uri(), Role::Admin);
    let teams = cp.list_teams().await.expect("teams listed");
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].id, "team_eng");
}

// ---------------------------------------------------------------------------
// Lists
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_list_configurations_sends_filter_and_reads_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mcp-server-configurations"))
        .and(query_param("connected_account_ownerships", "shared"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [configuration_json("cfg_1", "shared")],
            "offset": 0,
            "total": 1
        })))
        .mount(&server)
        .await;

    let cp = common::control_plane(&server.uri(), Role::Member);
    let page = cp
        .list_configurations(&ConfigurationQuery {
            offset: None,
            limit: Some(10),
            ownership: Some(Ownership::Shared),
        })
        .await
        .expect("page returned");

    assert_eq!(page.total, Some(1));
    assert_eq!(page.data[0].id, "cfg_1");
    assert_eq!(page.data[0].ownership, Ownership::Shared);
}

#[tokio::test]
async fn test_list_connected_accounts_by_configuration() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/connected-accounts"))
        .and(query_param("mcp_server_configuration_id", "cfg_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "id": "acc_1",
                "mcp_server_configuration_id": "cfg_1",
                "user_id": "user_a",
                "ownership": "individual",
                "api_key": "sk-live-1234567890"
            }
        ])))
        .mount(&server)
        .await;

    let cp = common::control_plane(&server.uri(), Role::Member);
    let accounts = cp
        .list_connected_accounts(Some("cfg_1"))
        .await
        .expect("accounts listed");

    assert_eq!(accounts.len(), 1);
    assert!(accounts[0].is_owned_by("user_a"));
    let masked = accounts[0].api_key_masked.as_deref().unwrap();
    assert!(!masked.contains("1234567890"), "api key must be masked: {masked}");
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_backend_error_message_is_extracted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mcp-server-bundles"))
        .and(body_json(serde_json::json!({
            "name": "Research",
            "mcp_server_configuration_ids": ["cfg_1"]
        })))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(serde_json::json!({ "detail": "Bundle name already taken" })),
        )
        .mount(&server)
        .await;

    let cp = common::control_plane(&server.uri(), Role::Member);
    let err = cp
        .create_bundle(&NewBundle {
            name: "Research".to_string(),
            mcp_server_configuration_ids: vec!["cfg_1".to_string()],
        })
        .await
        .unwrap_err();

    match err.downcast_ref::<OnboardError>() {
        Some(OnboardError::Backend { status, message }) => {
            assert_eq!(*status, 409);
            assert_eq!(message, "Bundle name already taken");
        }
        other => panic!("expected backend error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_backend_error_without_body_uses_status_reason() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mcp-servers/srv_missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let cp = common::control_plane(&server.uri(), Role::Member);
    let err = cp.get_resource_server("srv_missing").await.unwrap_err();
    assert_eq!(err.to_string(), "Backend error (HTTP 404): Not Found");
}

#[tokio::test]
async fn test_refresh_tools_posts_to_server_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/mcp-servers/srv_1/refresh-tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tools_created": ["search"],
            "tools_deleted": ["legacy"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cp = common::control_plane(&server.uri(), Role::Admin);
    let summary = cp.refresh_tools("srv_1").await.expect("summary");
    assert!(summary.tools_created.contains("search"));
    assert!(summary.tools_deleted.contains("legacy"));
    assert!(summary.tools_updated.is_empty());
}
