/*!
Command handlers for the CLI

Each submodule backs one command group:

- `auth`           -- store and remove the control-plane token
- `discover`       -- OAuth2 discovery, client registration, name checks
- `wizard`         -- answers-driven wizard runs
- `configurations` -- configuration listing
- `accounts`       -- connected account provisioning and callbacks
- `bundles`        -- bundle candidates and creation
- `servers`        -- tool re-sync

Handlers print human-readable output with `colored` and `prettytable`, or
pretty JSON when `--json` is given.
*/

use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use prettytable::{row, Table};
use serde::Serialize;

use crate::config::Config;
use crate::control_plane::{ControlPlane, HttpControlPlane};
use crate::error::{OnboardError, Result};
use crate::oauth2::discovery::{DiscoveryMode, OAuth2DiscoveryClient};

/// Builds the HTTP control-plane client from configuration.
fn connect(config: &Config) -> Result<Arc<dyn ControlPlane>> {
    let client = HttpControlPlane::new(config.client_config()?)?;
    Ok(Arc::new(client))
}

fn discovery_client(
    config: &Config,
    control_plane: Arc<dyn ControlPlane>,
    mode: DiscoveryMode,
) -> Result<OAuth2DiscoveryClient> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.control_plane.timeout_seconds))
        .build()
        .map_err(OnboardError::Http)?;
    Ok(OAuth2DiscoveryClient::new(control_plane).with_mode(mode, http))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(OnboardError::Serialization)?;
    println!("{}", json);
    Ok(())
}

fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or("-")
        .to_string()
}

/// Token storage commands.
pub mod auth {
    use super::*;
    use crate::credentials::{token_from_env, CredentialStore, StoredToken};

    /// Stores `token` for the configured control plane.
    pub fn login(config: &Config, token: &str, expires_in: Option<i64>) -> Result<()> {
        if token.trim().is_empty() {
            return Err(OnboardError::Validation("token must not be empty".to_string()).into());
        }
        let store = CredentialStore::for_control_plane(&config.control_plane_url()?);
        store.save(&StoredToken::new(token.trim(), expires_in))?;
        tracing::info!(account = %store.account(), "logged in");
        println!("{} token stored for {}", "✓".green(), store.account().cyan());
        if token_from_env().is_some() {
            println!(
                "{} MCP_ONBOARD_ACCESS_TOKEN is set and takes precedence",
                "!".yellow()
            );
        }
        Ok(())
    }

    /// Removes the stored token.
    pub fn logout(config: &Config) -> Result<()> {
        let store = CredentialStore::for_control_plane(&config.control_plane_url()?);
        store.delete()?;
        println!("{} logged out of {}", "✓".green(), store.account().cyan());
        Ok(())
    }
}

/// Discovery, registration and name checks.
pub mod discover {
    use super::*;
    use url::Url;

    use crate::models::validate_server_name;
    use crate::oauth2::discovery::DiscoveryOutcome;
    use crate::oauth2::registration::{AutomaticRegistration, DynamicClientRegistrar};

    fn parse_server_url(raw: &str) -> Result<Url> {
        Url::parse(raw.trim())
            .map_err(|e| OnboardError::Validation(format!("invalid server URL '{raw}': {e}")).into())
    }

    /// Probes `url` and prints the discovered endpoints.
    pub async fn run_discover(config: &Config, url: &str, direct: bool, json: bool) -> Result<()> {
        let url = parse_server_url(url)?;
        let mode = if direct {
            DiscoveryMode::Direct
        } else {
            config.oauth2.discovery_mode
        };
        let control_plane = connect(config)?;
        let client = discovery_client(config, control_plane, mode)?;

        match client.discover(&url).await {
            DiscoveryOutcome::Found(meta) => {
                if json {
                    return print_json(&meta);
                }
                let automatic = AutomaticRegistration::from_metadata(&meta).is_some();
                let mut table = Table::new();
                table.add_row(row!["Field", "Value"]);
                table.add_row(row!["authorize_url", or_dash(meta.authorize_url.as_deref())]);
                table.add_row(row!["access_token_url", or_dash(meta.access_token_url.as_deref())]);
                table.add_row(row!["refresh_token_url", or_dash(meta.refresh_token_url.as_deref())]);
                table.add_row(row!["registration_url", or_dash(meta.registration_url.as_deref())]);
                table.add_row(row![
                    "auth methods",
                    meta.token_endpoint_auth_method_supported
                        .as_deref()
                        .map(|m| m.join(", "))
                        .unwrap_or_else(|| "-".to_string())
                ]);
                println!("\nOAuth2 metadata for {}:\n", url.as_str().cyan());
                table.printstd();
                let mode = if automatic {
                    "automatic registration available".green()
                } else {
                    "manual registration only".yellow()
                };
                println!("\n{}\n", mode);
                Ok(())
            }
            DiscoveryOutcome::Unavailable { reason } => {
                if json {
                    return print_json(&serde_json::json!({ "unavailable": reason }));
                }
                println!(
                    "{} no OAuth2 metadata for {}: {}",
                    "!".yellow(),
                    url.as_str().cyan(),
                    reason
                );
                println!("Enter the endpoints and client credentials manually.");
                Ok(())
            }
        }
    }

    /// Discovers `url` and registers a client through the control plane.
    pub async fn run_register_client(config: &Config, url: &str, json: bool) -> Result<()> {
        let url = parse_server_url(url)?;
        let control_plane = connect(config)?;
        let client = discovery_client(config, control_plane.clone(), config.oauth2.discovery_mode)?;

        let outcome = client.discover(&url).await;
        let registration = outcome
            .metadata()
            .and_then(AutomaticRegistration::from_metadata)
            .ok_or_else(|| {
                OnboardError::Registration(format!(
                    "automatic registration is unavailable for {}",
                    url
                ))
            })?;

        let result = DynamicClientRegistrar::new(control_plane)
            .register(&url, &registration)
            .await?;

        if json {
            return print_json(&serde_json::json!({
                "client_id": result.client_id,
                "client_secret": result.client_secret,
                "token_endpoint_auth_method": result.token_endpoint_auth_method,
                "registration_url": result.registration_url,
                "issued_for": result.issued_for.as_str(),
            }));
        }
        println!("{} client registered for {}", "✓".green(), url.as_str().cyan());
        println!("  client_id:   {}", result.client_id.bold());
        println!(
            "  secret:      {}",
            result
                .client_secret
                .as_deref()
                .map(crate::models::mask_secret)
                .unwrap_or_else(|| "-".to_string())
        );
        println!("  auth method: {}", result.token_endpoint_auth_method);
        Ok(())
    }

    /// Checks `name` against the server naming rule.
    pub fn validate_name(name: &str, json: bool) -> Result<()> {
        let result = validate_server_name(name);
        if json {
            print_json(&serde_json::json!({
                "name": name,
                "valid": result.is_ok(),
                "error": result.as_ref().err().map(|e| e.to_string()),
            }))?;
        } else if result.is_ok() {
            println!("{} {} is a valid server name", "✓".green(), name.bold());
        }
        result
    }
}

/// Answers-driven wizard runs.
pub mod wizard {
    use super::*;
    use std::path::Path;

    use crate::wizard::{CommitReceipt, Surface, WizardAnswers, WizardSession, WizardState};

    /// Runs the wizard on `surface` with the answers in `answers_path`.
    pub async fn run_wizard(
        config: &Config,
        surface: Surface,
        answers_path: &Path,
        server_id: Option<String>,
        json: bool,
    ) -> Result<()> {
        let answers = WizardAnswers::load(answers_path)?;
        let control_plane = connect(config)?;
        let discovery =
            discovery_client(config, control_plane.clone(), config.oauth2.discovery_mode)?;
        let mut session =
            WizardSession::new(surface, config.actor()?, control_plane.clone(), discovery)?;

        if !surface.creates_server() {
            let server_id = server_id.or_else(|| answers.server_id.clone()).ok_or_else(|| {
                OnboardError::Validation(format!(
                    "surface '{}' needs --server-id or server_id in the answers",
                    surface
                ))
            })?;
            let server = control_plane.get_resource_server(&server_id).await?;
            session = session.with_state(WizardState::for_server(&server));
        }

        tracing::info!(%surface, answers = %answers_path.display(), "running wizard");
        let receipt = match answers.run(&mut session).await {
            Ok(receipt) => receipt,
            Err(e) => {
                eprintln!(
                    "{} wizard stopped at step '{}'",
                    "✗".red(),
                    session.current()
                );
                return Err(e);
            }
        };

        if json {
            return print_json(&receipt);
        }
        print_receipt(&receipt);
        Ok(())
    }

    fn print_receipt(receipt: &CommitReceipt) {
        if let Some(server) = &receipt.server {
            println!(
                "{} registered server {} ({})",
                "✓".green(),
                server.name.bold(),
                server.id.cyan()
            );
        }
        if let Some(configuration) = &receipt.configuration {
            println!(
                "{} created {} configuration {} with {}",
                "✓".green(),
                configuration.ownership,
                configuration.id.cyan(),
                configuration.auth_type.label()
            );
        }
    }
}

/// Configuration listing.
pub mod configurations {
    use super::*;
    use crate::models::{Configuration, ConfigurationQuery};

    /// Lists one page of configurations.
    pub async fn list(config: &Config, query: ConfigurationQuery, json: bool) -> Result<()> {
        let control_plane = connect(config)?;
        let page = control_plane.list_configurations(&query).await?;
        if json {
            return print_json(&page);
        }
        print_configurations(&page.data);
        if let Some(total) = page.total {
            let start = query.offset.unwrap_or(page.offset);
            println!("Showing {}-{} of {}\n", start, start as usize + page.data.len(), total);
        }
        Ok(())
    }

    pub(super) fn print_configurations(configurations: &[Configuration]) {
        if configurations.is_empty() {
            println!("No configurations found.");
            return;
        }
        let mut table = Table::new();
        table.add_row(row!["ID", "Name", "Server", "Auth", "Ownership", "Tools"]);
        for c in configurations {
            let tools = if c.all_tools_enabled {
                "all".to_string()
            } else {
                c.enabled_tools.len().to_string()
            };
            table.add_row(row![
                c.id,
                c.name,
                c.mcp_server_id,
                c.auth_type.label(),
                c.ownership,
                tools
            ]);
        }
        println!();
        table.printstd();
        println!();
    }
}

/// Connected account provisioning.
pub mod accounts {
    use super::*;
    use url::Url;

    use crate::models::{ApiKeySecret, Configuration, ConfigurationQuery};
    use crate::oauth2::callback::{clean_callback_url, parse_callback, CallbackOutcome};
    use crate::provision::{ConnectedAccountProvisioner, ProvisionPayload, Provisioned};

    const PAGE_SIZE: u32 = 100;

    /// Pages through configurations looking for `id`.
    pub async fn find_configuration(
        control_plane: &dyn ControlPlane,
        id: &str,
    ) -> Result<Option<Configuration>> {
        let mut offset = 0u32;
        loop {
            let query = ConfigurationQuery {
                offset: Some(offset),
                limit: Some(PAGE_SIZE),
                ..Default::default()
            };
            let page = control_plane.list_configurations(&query).await?;
            if let Some(found) = page.data.iter().find(|c| c.id == id) {
                return Ok(Some(found.clone()));
            }
            if page.data.is_empty() {
                return Ok(None);
            }
            offset += page.data.len() as u32;
            if page.total.map_or(false, |total| offset >= total) {
                return Ok(None);
            }
        }
    }

    /// Creates a connected account for `configuration_id`.
    pub async fn create(
        config: &Config,
        configuration_id: &str,
        api_key: Option<String>,
        return_to: Option<String>,
        json: bool,
    ) -> Result<()> {
        let control_plane = connect(config)?;
        let auth_type = find_configuration(control_plane.as_ref(), configuration_id)
            .await?
            .map(|c| c.auth_type);
        let provisioner =
            ConnectedAccountProvisioner::new(control_plane, config.actor()?, config.callback_target()?);
        let payload = ProvisionPayload {
            api_key: api_key.map(ApiKeySecret::new),
            return_to,
        };

        match provisioner.provision(configuration_id, auth_type, payload).await? {
            Provisioned::Account(account) => {
                if json {
                    return print_json(&account);
                }
                println!(
                    "{} connected account {} created",
                    "✓".green(),
                    account.id.cyan()
                );
            }
            Provisioned::Redirect(redirect) => {
                if json {
                    return print_json(&serde_json::json!({
                        "authorization_url": redirect.authorization_url,
                    }));
                }
                println!("Open this URL to authorize access:\n");
                println!("  {}\n", redirect.authorization_url.cyan());
                println!(
                    "Then run {} with the URL you land on.",
                    "mcp-onboard accounts callback <URL>".bold()
                );
            }
        }
        Ok(())
    }

    /// Interprets the callback URL and optionally confirms the account.
    pub async fn callback(
        config: &Config,
        url: &str,
        configuration_id: Option<&str>,
        json: bool,
    ) -> Result<()> {
        let url = Url::parse(url.trim())
            .map_err(|e| OnboardError::Validation(format!("invalid callback URL: {e}")))?;

        let return_to = match parse_callback(&url) {
            CallbackOutcome::Failed { error, message } => {
                let shown = message.unwrap_or_else(|| error.clone());
                tracing::warn!(%error, "OAuth2 callback reported a failure");
                return Err(OnboardError::Provisioning(shown).into());
            }
            CallbackOutcome::Completed { return_to } => return_to,
        };

        let account = match configuration_id {
            Some(id) => {
                let control_plane = connect(config)?;
                let provisioner = ConnectedAccountProvisioner::new(
                    control_plane,
                    config.actor()?,
                    config.callback_target()?,
                );
                provisioner.confirm_account(id).await?
            }
            None => None,
        };

        if json {
            return print_json(&serde_json::json!({
                "return_to": return_to,
                "account": account,
                "clean_url": clean_callback_url(&url).as_str(),
            }));
        }
        match (&account, configuration_id) {
            (Some(account), _) => println!(
                "{} connected account {} is ready",
                "✓".green(),
                account.id.cyan()
            ),
            (None, Some(id)) => println!(
                "{} authorization finished but no account exists yet for {}",
                "!".yellow(),
                id.cyan()
            ),
            (None, None) => println!("{} authorization finished", "✓".green()),
        }
        if let Some(return_to) = return_to {
            println!("Continue at {}", return_to.cyan());
        }
        Ok(())
    }

    /// Lists connected accounts.
    pub async fn list(config: &Config, configuration_id: Option<&str>, json: bool) -> Result<()> {
        let control_plane = connect(config)?;
        let accounts = control_plane.list_connected_accounts(configuration_id).await?;
        if json {
            return print_json(&accounts);
        }
        if accounts.is_empty() {
            println!("No connected accounts found.");
            return Ok(());
        }
        let mut table = Table::new();
        table.add_row(row!["ID", "Configuration", "User", "Ownership", "API key", "Last used"]);
        for a in &accounts {
            table.add_row(row![
                a.id,
                a.mcp_server_configuration_id,
                or_dash(a.user_id.as_deref()),
                a.ownership,
                or_dash(a.api_key_masked.as_deref()),
                a.last_used_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string())
            ]);
        }
        println!();
        table.printstd();
        println!();
        Ok(())
    }
}

/// Bundle commands.
pub mod bundles {
    use super::*;
    use crate::bundle::BundleBuilder;

    /// Shows which configurations the acting user can bundle.
    pub async fn candidates(config: &Config, json: bool) -> Result<()> {
        let builder = BundleBuilder::load(connect(config)?, config.actor()?, "").await?;
        let candidates = builder.candidates();
        if json {
            return print_json(&candidates);
        }
        if candidates.is_empty() {
            println!("No configurations available for bundling.");
            return Ok(());
        }
        let mut table = Table::new();
        table.add_row(row!["ID", "Name", "Ownership", "Addable"]);
        for c in &candidates {
            let addable = if c.addable {
                "yes".green()
            } else {
                "no account".red()
            };
            table.add_row(row![
                c.configuration.id,
                c.configuration.name,
                c.configuration.ownership,
                addable
            ]);
        }
        println!();
        table.printstd();
        println!();
        Ok(())
    }

    /// Creates a bundle named `name` from `configuration_ids`.
    pub async fn create(
        config: &Config,
        name: &str,
        configuration_ids: &[String],
        json: bool,
    ) -> Result<()> {
        let mut builder = BundleBuilder::load(connect(config)?, config.actor()?, name).await?;
        for id in configuration_ids {
            builder.add(id)?;
        }
        let bundle = builder.create().await?;
        if json {
            return print_json(&bundle);
        }
        println!(
            "{} bundle {} created with {} configuration(s)",
            "✓".green(),
            bundle.name.bold(),
            bundle.mcp_server_configuration_ids.len()
        );
        println!("  key: {}", bundle.bundle_key.cyan());
        Ok(())
    }
}

/// Resource server commands.
pub mod servers {
    use super::*;
    use crate::sync::ToolSyncer;

    /// Re-syncs the tools of `server_id`.
    pub async fn refresh(config: &Config, server_id: &str, json: bool) -> Result<()> {
        let control_plane = connect(config)?;
        let mut server = control_plane.get_resource_server(server_id).await?;
        let summary = ToolSyncer::new(control_plane, config.actor()?)
            .refresh(&mut server, chrono::Utc::now())
            .await?;
        if json {
            return print_json(&summary);
        }
        println!("{} tools re-synced for {}", "✓".green(), server.name.bold());
        let mut table = Table::new();
        table.add_row(row!["Created", "Updated", "Deleted", "Unchanged"]);
        table.add_row(row![
            summary.tools_created.len(),
            summary.tools_updated.len(),
            summary.tools_deleted.len(),
            summary.tools_unchanged.len()
        ]);
        table.printstd();
        Ok(())
    }
}
