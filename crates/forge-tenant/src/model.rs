//! Team Data Model

use chrono::{DateTime, Utc};
use forge_common::{Limit, ResourceId, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Team type (policy) id
pub type TeamTypeId = u64;

/// Internal instance type id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceTypeId(pub u64);

impl fmt::Display for InstanceTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classifier for a billable resource kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceType {
    /// Internal id
    pub id: InstanceTypeId,
    /// External-facing opaque id
    pub hashid: String,
    /// Display name
    pub name: String,
    /// Whether the type is offered at all
    pub active: bool,
    /// Display order
    pub order: u32,
}

/// Team definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    /// Unique team ID
    pub id: TeamId,
    /// Display name
    pub name: String,
    /// Policy reference
    pub team_type_id: TeamTypeId,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Team {
    /// Create new team
    pub fn new(name: &str, team_type_id: TeamTypeId) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            team_type_id,
            created_at: Utc::now(),
        }
    }
}

/// Team membership role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    /// Read-only
    Viewer,
    /// Regular member
    Member,
    /// Team creator or promoted owner
    Owner,
}

/// Team member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub user_id: Uuid,
    /// Role within the team
    pub role: TeamRole,
}

/// Device assigned to a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Device id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Owning team
    pub team_id: TeamId,
}

/// Resource lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    /// Up, and billed when the team pays
    Running,
    /// Down, not billed, data kept
    Suspended,
    /// Down without a suspend
    Stopped,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Suspended => write!(f, "suspended"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Billable resource (instance) owned by a team
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Resource id
    pub id: ResourceId,
    /// Owning team
    pub team_id: TeamId,
    /// Display name
    pub name: String,
    /// Instance type it runs as
    pub instance_type: InstanceTypeId,
    /// Current lifecycle state
    pub state: ResourceState,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Resource {
    /// New running resource
    pub fn new(team_id: TeamId, name: &str, instance_type: InstanceTypeId) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            name: name.to_string(),
            instance_type,
            state: ResourceState::Running,
            created_at: Utc::now(),
        }
    }
}

/// Team type: a named, ranked bundle of limits and trial configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamType {
    /// Team type id
    pub id: TeamTypeId,
    /// Display name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Offered for new teams
    #[serde(default = "default_true")]
    pub active: bool,
    /// Rank among team types
    #[serde(default)]
    pub order: u32,
    /// Limits and trial
    pub properties: TeamTypeProperties,
}

fn default_true() -> bool {
    true
}

/// Count limit; a missing `limit` key means unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountLimit {
    /// Cap; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl CountLimit {
    /// Limit of exactly `limit`
    pub fn bounded(limit: u64) -> Self {
        Self { limit: Some(limit) }
    }

    /// As a [`Limit`]
    pub fn as_limit(&self) -> Limit {
        Limit::from_option(self.limit)
    }
}

/// Per instance type availability and cap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceTypeLimit {
    /// Offered to the team
    #[serde(default)]
    pub active: bool,
    /// Cap; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl InstanceTypeLimit {
    /// Effective limit: zero when inactive
    pub fn effective(&self) -> Limit {
        if self.active {
            Limit::from_option(self.limit)
        } else {
            Limit::Bounded(0)
        }
    }
}

/// Trial configuration.
///
/// A trial naming an `instance_type` is a legacy trial: only that type may be
/// created, and only one trial resource per team, ever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialPolicy {
    /// Whether new teams start a trial
    #[serde(default)]
    pub active: bool,
    /// Only type allowed during a legacy trial
    #[serde(default, rename = "instanceType", skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<InstanceTypeId>,
    /// Trial length in days
    #[serde(default)]
    pub duration: u32,
}

impl TrialPolicy {
    /// Trial restricted to a single designated instance type
    pub fn is_legacy(&self) -> bool {
        self.instance_type.is_some()
    }
}

/// Structured limits of a team type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamTypeProperties {
    #[serde(default)]
    pub users: CountLimit,
    /// Device cap
    #[serde(default)]
    pub devices: CountLimit,
    /// Instance types absent from this map are implicitly inactive
    #[serde(default)]
    pub instances: BTreeMap<InstanceTypeId, InstanceTypeLimit>,
    /// Trial for new teams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trial: Option<TrialPolicy>,
    /// Opaque feature settings passed through to clients
    #[serde(default)]
    pub features: serde_json::Map<String, serde_json::Value>,
}

impl TeamTypeProperties {
    /// Set the user cap
    pub fn with_users(mut self, limit: Option<u64>) -> Self {
        self.users = CountLimit { limit };
        self
    }

    /// Set the device cap
    pub fn with_devices(mut self, limit: Option<u64>) -> Self {
        self.devices = CountLimit { limit };
        self
    }

    /// Set availability and cap of one instance type
    pub fn with_instance(mut self, id: InstanceTypeId, active: bool, limit: Option<u64>) -> Self {
        self.instances.insert(id, InstanceTypeLimit { active, limit });
        self
    }

    /// Set the trial
    pub fn with_trial(mut self, trial: TrialPolicy) -> Self {
        self.trial = Some(trial);
        self
    }

    /// Limit entry for an instance type, defaulting to inactive
    pub fn instance_limit(&self, id: InstanceTypeId) -> InstanceTypeLimit {
        self.instances.get(&id).copied().unwrap_or_default()
    }

    /// Active trial policy, if any
    pub fn active_trial(&self) -> Option<TrialPolicy> {
        self.trial.filter(|t| t.active)
    }
}
