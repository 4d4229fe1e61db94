//! Teams used to scope configuration visibility

use serde::{Deserialize, Serialize};

/// An organization team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Stable identifier
    #[serde(alias = "team_id")]
    pub id: String,
    /// Display name
    pub name: String,
}
