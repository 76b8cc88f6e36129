//! API Models

use chrono::{DateTime, Utc};
use forge_common::{Limit, TeamId};
use forge_tenant::{Team, TeamRole, TeamTypeId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `{status: "okay"}`
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Always `okay`
    pub status: String,
}

impl StatusResponse {
    /// The `okay` response
    pub fn okay() -> Self {
        Self { status: "okay".into() }
    }
}

// ============ Teams ============

/// Team create body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCreate {
    /// Display name
    pub name: String,
    /// Team type id
    pub team_type: TeamTypeId,
    /// Becomes the team owner; generated when absent
    #[serde(default)]
    pub owner: Option<Uuid>,
}

/// Team type change body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTypeChange {
    /// Target team type id
    pub team_type: TeamTypeId,
}

/// Team as returned by the API
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamView {
    /// Team id
    pub id: TeamId,
    /// Display name
    pub name: String,
    /// Current team type id
    pub team_type: TeamTypeId,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl From<Team> for TeamView {
    fn from(team: Team) -> Self {
        Self {
            id: team.id,
            name: team.name,
            team_type: team.team_type_id,
            created_at: team.created_at,
        }
    }
}

/// Member add body; an existing member gets the new role
#[derive(Debug, Deserialize)]
pub struct MemberAdd {
    pub user: Uuid,
    /// New role
    pub role: TeamRole,
}

/// Device add body
#[derive(Debug, Deserialize)]
pub struct DeviceAdd {
    /// Display name
    pub name: String,
}

/// Limit with the matching live count
#[derive(Debug, Serialize, Deserialize)]
pub struct LimitUsage {
    /// `-1` when unbounded
    pub limit: Limit,
    /// Live count
    pub count: u64,
}

/// Limit and count for one instance type
#[derive(Debug, Serialize, Deserialize)]
pub struct InstanceLimitView {
    /// External instance type id
    #[serde(rename = "type")]
    pub instance_type: String,
    /// Instance type name
    pub name: String,
    /// Offered to this team
    pub active: bool,
    /// Zero when inactive
    pub limit: Limit,
    /// Live resources of the type
    pub count: u64,
}

/// Team limits next to live usage
#[derive(Debug, Serialize, Deserialize)]
pub struct TeamLimits {
    pub users: LimitUsage,
    /// Registered devices
    pub devices: LimitUsage,
    /// One entry per catalog instance type
    pub instances: Vec<InstanceLimitView>,
}

// ============ Resources ============

/// Resource create body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCreate {
    /// Display name
    pub name: String,
    /// External instance type id
    pub instance_type: String,
}

// ============ Flow blueprints ============

/// Query of the blueprint listing
#[derive(Debug, Default, Deserialize)]
pub struct BlueprintListQuery {
    /// `active`, `inactive` or `all`; anything else lists active blueprints
    #[serde(default)]
    pub filter: Option<String>,
    /// Id of the last blueprint on the previous page
    #[serde(default)]
    pub cursor: Option<Uuid>,
    /// Page size, capped
    #[serde(default)]
    pub limit: Option<usize>,
}
