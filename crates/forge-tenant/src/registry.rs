//! Team Lifecycle Management

use forge_common::{AuditEntry, AuditLog, ForgeError, ForgeResult, TeamId};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::entitlements::EntitlementEvaluator;
use crate::model::{Device, Member, Team, TeamRole, TeamTypeId};
use crate::policy::PolicyStore;
use crate::store::TenantStore;

/// Team count allowed without a license
pub const DEFAULT_UNLICENSED_TEAMS: u64 = 5;

/// Deployment license
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct License {
    /// Whether a license is installed
    pub licensed: bool,
    /// Team cap
    pub teams: u64,
}

impl Default for License {
    fn default() -> Self {
        Self {
            licensed: false,
            teams: DEFAULT_UNLICENSED_TEAMS,
        }
    }
}

/// Team registry
pub struct TeamRegistry {
    store: Arc<TenantStore>,
    policies: Arc<PolicyStore>,
    evaluator: Arc<EntitlementEvaluator>,
    audit: Arc<dyn AuditLog>,
    license: License,
}

impl TeamRegistry {
    /// Registry enforcing `license`
    pub fn new(
        store: Arc<TenantStore>,
        policies: Arc<PolicyStore>,
        evaluator: Arc<EntitlementEvaluator>,
        audit: Arc<dyn AuditLog>,
        license: License,
    ) -> Self {
        Self {
            store,
            policies,
            evaluator,
            audit,
            license,
        }
    }

    /// Installed license
    pub fn license(&self) -> &License {
        &self.license
    }

    /// Create a team, enforcing the license team cap
    pub fn create(&self, name: &str, team_type_id: TeamTypeId, owner: Uuid) -> ForgeResult<Team> {
        self.policies.get_policy(team_type_id)?;
        let license = &self.license;

        let team = self.store.insert_team_checked(Team::new(name, team_type_id), |count| {
            let count = count as u64;
            if count < license.teams {
                return Ok(());
            }
            if license.licensed {
                tracing::warn!(teams = count + 1, cap = license.teams, "licensed team count exceeded");
                return Ok(());
            }
            Err(ForgeError::limit_reached(
                "team_limit_reached",
                format!("team limit of {} reached", license.teams),
            ))
        })?;
        self.store.add_member(&team.id, owner, TeamRole::Owner)?;

        tracing::info!(team = %team.id, name, team_type = team_type_id, "team created");
        Ok(team)
    }

    /// Delete a team with everything it owns
    pub fn delete(&self, team_id: &TeamId) -> ForgeResult<Team> {
        let team = self.store.remove_team(team_id)?;
        tracing::info!(team = %team_id, "team deleted");
        Ok(team)
    }

    /// Team by id
    pub fn get(&self, team_id: &TeamId) -> ForgeResult<Team> {
        self.store.team(team_id)
    }

    /// Teams by creation time
    pub fn list(&self) -> Vec<Team> {
        let mut teams = self.store.teams();
        teams.sort_by_key(|t| t.created_at);
        teams
    }

    /// Number of teams
    pub fn count(&self) -> usize {
        self.store.team_count()
    }

    /// Add a member within the team type's user limit; role changes always pass
    pub fn add_member(&self, team_id: &TeamId, user_id: Uuid, role: TeamRole) -> ForgeResult<()> {
        self.evaluator.add_member_checked(team_id, user_id, role)
    }

    /// Members of a team
    pub fn members(&self, team_id: &TeamId) -> Vec<Member> {
        self.store.members(team_id)
    }

    /// Register a device within the team type's device limit
    pub fn add_device(&self, team_id: &TeamId, name: &str) -> ForgeResult<Device> {
        self.evaluator.add_device_checked(team_id, name)
    }

    /// Move a team to another team type if its current usage fits
    pub fn change_type(&self, team_id: &TeamId, team_type_id: TeamTypeId) -> ForgeResult<Team> {
        let candidate = self.policies.get_policy(team_type_id)?;
        self.evaluator.check_team_type_update_allowed(team_id, &candidate)?;

        let previous = self.evaluator.update_team_type(team_id, team_type_id)?;
        if previous != team_type_id {
            self.audit
                .record(AuditEntry::team_type_changed(*team_id, previous, team_type_id));
        }
        self.store.team(team_id)
    }
}
