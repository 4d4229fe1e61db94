//! Connected account provisioning
//!
//! One of three protocols runs, chosen by the configuration's auth type:
//!
//! - `no_auth`: one create call, the account exists immediately
//! - `api_key`: the key is checked locally, then one create call carries it
//! - `oauth2`: one create call returns an authorization URL; the account is
//!   finalized out of band when the authorization server calls back
//!
//! The capability check and every local validation run before any network
//! call.

use std::sync::Arc;

use crate::control_plane::ControlPlane;
use crate::error::{OnboardError, Result};
use crate::models::{
    ApiKeySecret, AuthType, ConnectedAccount, CreateAccountResponse, NewConnectedAccount,
};
use crate::oauth2::callback::CallbackTarget;
use crate::permissions::{Actor, Capability};

/// Message used when the backend gives no reason for a rejection.
pub const GENERIC_PROVISIONING_FAILURE: &str = "Failed to create connected account";

/// Caller-supplied inputs.
#[derive(Debug, Clone, Default)]
pub struct ProvisionPayload {
    /// Key for API-key configurations
    pub api_key: Option<ApiKeySecret>,
    /// Where to resume after the OAuth2 callback
    pub return_to: Option<String>,
}

/// Browser redirect the caller must follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRedirect {
    /// Opaque URL returned by the backend, unchanged
    pub authorization_url: String,
}

/// Result of a provisioning attempt.
#[derive(Debug, Clone)]
pub enum Provisioned {
    /// The account was created
    Account(ConnectedAccount),
    /// The user must authorize in the browser first
    Redirect(PendingRedirect),
}

/// Creates connected accounts for configurations.
#[derive(Debug, Clone)]
pub struct ConnectedAccountProvisioner {
    control_plane: Arc<dyn ControlPlane>,
    actor: Actor,
    callback: CallbackTarget,
}

impl ConnectedAccountProvisioner {
    /// Creates a provisioner acting as `actor`.
    pub fn new(control_plane: Arc<dyn ControlPlane>, actor: Actor, callback: CallbackTarget) -> Self {
        Self {
            control_plane,
            actor,
            callback,
        }
    }

    /// Provisions an account for `configuration_id`.
    ///
    /// # Errors
    ///
    /// - [`OnboardError::PermissionDenied`] without `create_connected_account`
    /// - [`OnboardError::UnknownAuthType`] when `auth_type` is `None`
    /// - [`OnboardError::Validation`] for a missing or blank API key
    /// - [`OnboardError::Provisioning`] when the backend rejects the request
    pub async fn provision(
        &self,
        configuration_id: &str,
        auth_type: Option<AuthType>,
        payload: ProvisionPayload,
    ) -> Result<Provisioned> {
        self.actor.require(Capability::CreateConnectedAccount)?;

        let auth_type = auth_type.ok_or_else(|| {
            OnboardError::UnknownAuthType(format!(
                "configuration '{configuration_id}' has no auth type"
            ))
        })?;

        let body = match auth_type {
            AuthType::NoAuth => NewConnectedAccount {
                mcp_server_configuration_id: configuration_id.to_string(),
                auth_type,
                api_key: None,
                redirect_url_after_account_creation: None,
            },
            AuthType::ApiKey => {
                let api_key = payload
                    .api_key
                    .filter(|k| !k.is_blank())
                    .ok_or_else(|| OnboardError::Validation("API key is required".to_string()))?;
                NewConnectedAccount {
                    mcp_server_configuration_id: configuration_id.to_string(),
                    auth_type,
                    api_key: Some(api_key),
                    redirect_url_after_account_creation: None,
                }
            }
            AuthType::OAuth2 => NewConnectedAccount {
                mcp_server_configuration_id: configuration_id.to_string(),
                auth_type,
                api_key: None,
                redirect_url_after_account_creation: Some(
                    self.callback
                        .redirect_url(payload.return_to.as_deref())
                        .to_string(),
                ),
            },
        };

        tracing::debug!(configuration_id, %auth_type, "creating connected account");

        let response = self
            .control_plane
            .create_connected_account(&body)
            .await
            .map_err(provisioning_error)?;

        match (auth_type, response) {
            (AuthType::OAuth2, CreateAccountResponse::AuthorizationUrl { authorization_url }) => {
                tracing::info!(configuration_id, "OAuth2 authorization required");
                Ok(Provisioned::Redirect(PendingRedirect { authorization_url }))
            }
            (AuthType::OAuth2, CreateAccountResponse::Account(_)) => Err(OnboardError::Provisioning(
                "expected an authorization URL for an OAuth2 configuration".to_string(),
            )
            .into()),
            (_, CreateAccountResponse::Account(account)) => {
                tracing::info!(configuration_id, account_id = %account.id, "connected account created");
                Ok(Provisioned::Account(account))
            }
            (_, CreateAccountResponse::AuthorizationUrl { .. }) => Err(OnboardError::Provisioning(
                format!("unexpected authorization URL for a {auth_type} configuration"),
            )
            .into()),
        }
    }

    /// Re-fetches accounts after an OAuth2 callback and returns the acting
    /// user's account for `configuration_id`, if it now exists.
    ///
    /// Shared accounts have no owner and count for every user.
    pub async fn confirm_account(&self, configuration_id: &str) -> Result<Option<ConnectedAccount>> {
        let accounts = self
            .control_plane
            .list_connected_accounts(Some(configuration_id))
            .await?;
        let found = accounts.into_iter().find(|a| {
            a.mcp_server_configuration_id == configuration_id
                && (a.user_id.is_none() || a.is_owned_by(&self.actor.user_id))
        });
        match &found {
            Some(account) => tracing::info!(configuration_id, account_id = %account.id, "account confirmed"),
            None => tracing::warn!(configuration_id, "no connected account found after callback"),
        }
        Ok(found)
    }
}

fn provisioning_error(err: anyhow::Error) -> anyhow::Error {
    let message = match err.downcast_ref::<OnboardError>() {
        Some(OnboardError::Backend { message, .. }) if !message.trim().is_empty() => {
            message.clone()
        }
        _ => GENERIC_PROVISIONING_FAILURE.to_string(),
    };
    tracing::warn!(error = %err, "connected account creation failed");
    OnboardError::Provisioning(message).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_plane::fake::FakeControlPlane;
    use crate::models::Ownership;
    use crate::permissions::Role;

    fn callback() -> CallbackTarget {
        CallbackTarget::new("https://app.example.com", "/connected-accounts/callback").unwrap()
    }

    fn provisioner(fake: &Arc<FakeControlPlane>, role: Role) -> ConnectedAccountProvisioner {
        ConnectedAccountProvisioner::new(fake.clone(), Actor::new("user_a", role), callback())
    }

    fn account(id: &str, user: Option<&str>) -> ConnectedAccount {
        ConnectedAccount {
            id: id.to_string(),
            mcp_server_configuration_id: "cfg_1".to_string(),
            user_id: user.map(str::to_string),
            ownership: Ownership::Individual,
            created_at: None,
            updated_at: None,
            last_used_at: None,
            api_key_masked: None,
        }
    }

    fn kind(err: &anyhow::Error) -> &OnboardError {
        err.downcast_ref::<OnboardError>().expect("OnboardError")
    }

    #[tokio::test]
    async fn test_missing_auth_type_is_unknown_auth_type() {
        let fake = Arc::new(FakeControlPlane::new());
        let err = provisioner(&fake, Role::Member)
            .provision("cfg_1", None, ProvisionPayload::default())
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), OnboardError::UnknownAuthType(_)));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_blank_api_key_fails_without_network_call() {
        let fake = Arc::new(FakeControlPlane::new());
        let payload = ProvisionPayload {
            api_key: Some(ApiKeySecret::new("   ")),
            return_to: None,
        };
        let err = provisioner(&fake, Role::Member)
            .provision("cfg_1", Some(AuthType::ApiKey), payload)
            .await
            .unwrap_err();
        assert!(matches!(kind(&err), OnboardError::Validation(_)));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_permission_checked_before_anything_else() {
        let fake = Arc::new(FakeControlPlane::new());
        let actor = Actor::new("user_a", Role::Member).with_capabilities(Vec::<Capability>::new());
        let provisioner = ConnectedAccountProvisioner::new(fake.clone(), actor, callback());
        let err = provisioner
            .provision("cfg_1", None, ProvisionPayload::default())
            .await
            .unwrap_err();
        match kind(&err) {
            OnboardError::PermissionDenied { capability } => {
                assert_eq!(capability, "create_connected_account")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_api_key_account_created_with_secret() {
        let fake = Arc::new(FakeControlPlane::new());
        fake.set_create_account(Ok(CreateAccountResponse::Account(account("acc_1", Some("user_a")))));
        let payload = ProvisionPayload {
            api_key: Some(ApiKeySecret::new("sk-123456")),
            return_to: None,
        };
        let result = provisioner(&fake, Role::Member)
            .provision("cfg_1", Some(AuthType::ApiKey), payload)
            .await
            .unwrap();
        assert!(matches!(result, Provisioned::Account(a) if a.id == "acc_1"));
        let sent = fake.new_accounts();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].api_key.as_ref().unwrap().expose(), "sk-123456");
    }

    #[tokio::test]
    async fn test_oauth2_returns_redirect_verbatim() {
        let fake = Arc::new(FakeControlPlane::new());
        let url = "https://auth.example.com/authorize?state=opaque%2Fvalue&x=1";
        fake.set_create_account(Ok(CreateAccountResponse::AuthorizationUrl {
            authorization_url: url.to_string(),
        }));
        let payload = ProvisionPayload {
            api_key: None,
            return_to: Some("/bundles".to_string()),
        };
        let result = provisioner(&fake, Role::Member)
            .provision("cfg_1", Some(AuthType::OAuth2), payload)
            .await
            .unwrap();
        match result {
            Provisioned::Redirect(redirect) => assert_eq!(redirect.authorization_url, url),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            fake.new_accounts()[0]
                .redirect_url_after_account_creation
                .as_deref(),
            Some("https://app.example.com/connected-accounts/callback?return_to=%2Fbundles")
        );
    }

    #[tokio::test]
    async fn test_backend_message_surfaces_or_generic_fallback() {
        let fake = Arc::new(FakeControlPlane::new());
        fake.set_create_account(Err((409, "Account already exists".to_string())));
        let err = provisioner(&fake, Role::Member)
            .provision("cfg_1", Some(AuthType::NoAuth), ProvisionPayload::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Provisioning error: Account already exists");

        fake.set_create_account(Err((500, String::new())));
        let err = provisioner(&fake, Role::Member)
            .provision("cfg_1", Some(AuthType::NoAuth), ProvisionPayload::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Provisioning error: {GENERIC_PROVISIONING_FAILURE}")
        );
    }

    #[tokio::test]
    async fn test_confirm_account_finds_own_account_only() {
        let fake = Arc::new(FakeControlPlane::new());
        fake.add_account(account("acc_other", Some("user_b")));
        let provisioner = provisioner(&fake, Role::Member);
        assert!(provisioner.confirm_account("cfg_1").await.unwrap().is_none());

        fake.add_account(account("acc_mine", Some("user_a")));
        let found = provisioner.confirm_account("cfg_1").await.unwrap().unwrap();
        assert_eq!(found.id, "acc_mine");
    }
}
