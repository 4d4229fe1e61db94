//! Tool re-sync with a client-side cooldown
//!
//! A server's tool list may be re-synced at most once per [`SYNC_COOLDOWN_SECS`],
//! measured from the server-supplied `last_synced_at`. The check here only
//! saves a round trip; the control plane enforces the same window and its
//! rejection is passed through unchanged.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::control_plane::ControlPlane;
use crate::error::{OnboardError, Result};
use crate::models::{ResourceServer, ToolRefreshSummary};
use crate::permissions::{Actor, Capability};

/// Minimum number of seconds between two syncs of the same server.
pub const SYNC_COOLDOWN_SECS: i64 = 60;

/// [`SYNC_COOLDOWN_SECS`] as a duration.
pub fn sync_cooldown() -> Duration {
    Duration::seconds(SYNC_COOLDOWN_SECS)
}

/// Cooldown arithmetic.
pub struct SyncCooldown;

impl SyncCooldown {
    /// `true` when there was no previous sync or the cooldown has elapsed.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use mcp_onboard::sync::SyncCooldown;
    ///
    /// let last = Utc::now();
    /// assert!(!SyncCooldown::is_allowed(Some(last), last + Duration::seconds(30)));
    /// assert!(SyncCooldown::is_allowed(Some(last), last + Duration::seconds(61)));
    /// assert!(SyncCooldown::is_allowed(None, last));
    /// ```
    pub fn is_allowed(last_synced_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        Self::remaining(last_synced_at, now).is_none()
    }

    /// Time left before the next sync, `None` when allowed now.
    pub fn remaining(last_synced_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Duration> {
        let elapsed = now - last_synced_at?;
        let cooldown = sync_cooldown();
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }
}

/// Triggers tool re-syncs.
#[derive(Debug, Clone)]
pub struct ToolSyncer {
    control_plane: Arc<dyn ControlPlane>,
    actor: Actor,
}

impl ToolSyncer {
    /// Creates a syncer acting as `actor`.
    pub fn new(control_plane: Arc<dyn ControlPlane>, actor: Actor) -> Self {
        Self {
            control_plane,
            actor,
        }
    }

    /// Re-syncs the tools of `server` as of `now` and records `now` as its
    /// `last_synced_at`, so an immediate second call is refused locally.
    ///
    /// # Errors
    ///
    /// - [`OnboardError::PermissionDenied`] without `sync_tools`
    /// - [`OnboardError::SyncCooldown`] inside the cooldown window
    /// - backend errors, including the server's own cooldown rejection
    pub async fn refresh(
        &self,
        server: &mut ResourceServer,
        now: DateTime<Utc>,
    ) -> Result<ToolRefreshSummary> {
        self.actor.require(Capability::SyncTools)?;

        if let Some(remaining) = SyncCooldown::remaining(server.last_synced_at, now) {
            // Round up so a 0.4s wait is not reported as 0s.
            let remaining_secs = (remaining.num_milliseconds() + 999) / 1000;
            return Err(OnboardError::SyncCooldown { remaining_secs }.into());
        }

        let summary = self.control_plane.refresh_tools(&server.id).await?;
        server.last_synced_at = Some(now);
        tracing::info!(
            server_id = %server.id,
            created = summary.tools_created.len(),
            updated = summary.tools_updated.len(),
            deleted = summary.tools_deleted.len(),
            "tools re-synced"
        );
        Ok(summary)
    }
}
