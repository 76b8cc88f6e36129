//! Tenant Store
//!
//! Teams, members, devices and resources live behind a single lock so that a
//! decision reads counts from one consistent snapshot, and so that
//! check-then-create is atomic with respect to concurrent creations.

use forge_common::{ForgeError, ForgeResult, ResourceId, TeamId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::model::{
    Device, InstanceTypeId, Member, Resource, ResourceState, Team, TeamRole, TeamTypeId,
};

/// Live counts for one team, taken under a single read
#[derive(Debug, Clone)]
pub struct TeamUsage {
    /// The team itself
    pub team: Team,
    /// Member count
    pub members: u64,
    /// Device count
    pub devices: u64,
    /// Live resources per instance type
    pub instances: BTreeMap<InstanceTypeId, u64>,
}

impl TeamUsage {
    /// Count of live resources of one type
    pub fn instances_of(&self, id: InstanceTypeId) -> u64 {
        self.instances.get(&id).copied().unwrap_or(0)
    }

    /// Count of all live resources
    pub fn total_instances(&self) -> u64 {
        self.instances.values().sum()
    }
}

#[derive(Default)]
struct TenantState {
    teams: HashMap<TeamId, Team>,
    members: HashMap<TeamId, Vec<Member>>,
    devices: HashMap<Uuid, Device>,
    resources: HashMap<ResourceId, Resource>,
}

impl TenantState {
    fn team(&self, team_id: &TeamId) -> ForgeResult<&Team> {
        self.teams
            .get(team_id)
            .ok_or_else(|| ForgeError::not_found(format!("team {}", team_id)))
    }

    fn usage(&self, team_id: &TeamId) -> ForgeResult<TeamUsage> {
        let team = self.team(team_id)?.clone();
        let members = self.members.get(team_id).map(|m| m.len() as u64).unwrap_or(0);
        let devices = self.devices.values().filter(|d| d.team_id == *team_id).count() as u64;

        let mut instances = BTreeMap::new();
        for resource in self.resources.values().filter(|r| r.team_id == *team_id) {
            *instances.entry(resource.instance_type).or_insert(0) += 1;
        }

        Ok(TeamUsage {
            team,
            members,
            devices,
            instances,
        })
    }
}

/// In-memory tenant store
#[derive(Default)]
pub struct TenantStore {
    state: RwLock<TenantState>,
}

impl TenantStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Teams =====

    /// Insert a team if `check` accepts the current team count
    pub fn insert_team_checked<F>(&self, team: Team, check: F) -> ForgeResult<Team>
    where
        F: FnOnce(usize) -> ForgeResult<()>,
    {
        let mut state = self.state.write();
        check(state.teams.len())?;
        state.teams.insert(team.id, team.clone());
        Ok(team)
    }

    /// Team by id
    pub fn team(&self, team_id: &TeamId) -> ForgeResult<Team> {
        self.state.read().team(team_id).cloned()
    }

    /// Every team, unordered
    pub fn teams(&self) -> Vec<Team> {
        self.state.read().teams.values().cloned().collect()
    }

    /// Number of teams
    pub fn team_count(&self) -> usize {
        self.state.read().teams.len()
    }

    /// Point a team at another team type, returning the previous one
    pub fn set_team_type(&self, team_id: &TeamId, team_type_id: TeamTypeId) -> ForgeResult<TeamTypeId> {
        let mut state = self.state.write();
        let team = state
            .teams
            .get_mut(team_id)
            .ok_or_else(|| ForgeError::not_found(format!("team {}", team_id)))?;
        Ok(std::mem::replace(&mut team.team_type_id, team_type_id))
    }

    /// Remove a team with its members, devices and resources
    pub fn remove_team(&self, team_id: &TeamId) -> ForgeResult<Team> {
        let mut state = self.state.write();
        let team = state
            .teams
            .remove(team_id)
            .ok_or_else(|| ForgeError::not_found(format!("team {}", team_id)))?;
        state.members.remove(team_id);
        state.devices.retain(|_, d| d.team_id != *team_id);
        state.resources.retain(|_, r| r.team_id != *team_id);
        Ok(team)
    }

    // ===== Members & devices =====

    /// Add a member or change its role, without checking limits
    pub fn add_member(&self, team_id: &TeamId, user_id: Uuid, role: TeamRole) -> ForgeResult<()> {
        let mut state = self.state.write();
        state.team(team_id)?;
        let members = state.members.entry(*team_id).or_default();
        match members.iter_mut().find(|m| m.user_id == user_id) {
            Some(existing) => existing.role = role,
            None => members.push(Member { user_id, role }),
        }
        Ok(())
    }

    /// Add a member if `check` accepts the team's usage. Changing the role
    /// of an existing member takes no new seat and is never checked.
    pub fn insert_member_checked<F>(&self, team_id: &TeamId, user_id: Uuid, role: TeamRole, check: F) -> ForgeResult<()>
    where
        F: FnOnce(&TeamUsage) -> ForgeResult<()>,
    {
        let mut state = self.state.write();
        let usage = state.usage(team_id)?;
        let members = state.members.entry(*team_id).or_default();
        if let Some(existing) = members.iter_mut().find(|m| m.user_id == user_id) {
            existing.role = role;
            return Ok(());
        }
        check(&usage)?;
        members.push(Member { user_id, role });
        Ok(())
    }

    /// Members of a team
    pub fn members(&self, team_id: &TeamId) -> Vec<Member> {
        self.state.read().members.get(team_id).cloned().unwrap_or_default()
    }

    /// Role of a user within a team
    pub fn member_role(&self, team_id: &TeamId, user_id: &Uuid) -> Option<TeamRole> {
        self.state
            .read()
            .members
            .get(team_id)?
            .iter()
            .find(|m| m.user_id == *user_id)
            .map(|m| m.role)
    }

    /// Register a device without checking limits
    pub fn add_device(&self, team_id: &TeamId, name: &str) -> ForgeResult<Device> {
        let mut state = self.state.write();
        state.team(team_id)?;
        let device = Device {
            id: Uuid::new_v4(),
            name: name.to_string(),
            team_id: *team_id,
        };
        state.devices.insert(device.id, device.clone());
        Ok(device)
    }

    /// Add a device if `check` accepts the team's usage, under one write lock
    pub fn insert_device_checked<F>(&self, team_id: &TeamId, name: &str, check: F) -> ForgeResult<Device>
    where
        F: FnOnce(&TeamUsage) -> ForgeResult<()>,
    {
        let mut state = self.state.write();
        check(&state.usage(team_id)?)?;
        let device = Device {
            id: Uuid::new_v4(),
            name: name.to_string(),
            team_id: *team_id,
        };
        state.devices.insert(device.id, device.clone());
        Ok(device)
    }

    /// Remove a device
    pub fn remove_device(&self, device_id: &Uuid) -> ForgeResult<Device> {
        self.state
            .write()
            .devices
            .remove(device_id)
            .ok_or_else(|| ForgeError::not_found(format!("device {}", device_id)))
    }

    // ===== Usage =====

    /// Consistent snapshot of a team's live counts
    pub fn usage(&self, team_id: &TeamId) -> ForgeResult<TeamUsage> {
        self.state.read().usage(team_id)
    }

    // ===== Resources =====

    /// Insert a resource if `check` accepts the owning team's usage.
    ///
    /// The check and the insert happen under the same write lock.
    pub fn insert_resource_checked<F>(&self, resource: Resource, check: F) -> ForgeResult<Resource>
    where
        F: FnOnce(&TeamUsage) -> ForgeResult<()>,
    {
        let mut state = self.state.write();
        let usage = state.usage(&resource.team_id)?;
        check(&usage)?;
        state.resources.insert(resource.id, resource.clone());
        Ok(resource)
    }

    /// Resource by id
    pub fn resource(&self, resource_id: &ResourceId) -> ForgeResult<Resource> {
        self.state
            .read()
            .resources
            .get(resource_id)
            .cloned()
            .ok_or_else(|| ForgeError::not_found(format!("resource {}", resource_id)))
    }

    /// Resources of a team, oldest first
    pub fn team_resources(&self, team_id: &TeamId) -> Vec<Resource> {
        let mut resources: Vec<_> = self
            .state
            .read()
            .resources
            .values()
            .filter(|r| r.team_id == *team_id)
            .cloned()
            .collect();
        resources.sort_by_key(|r| r.created_at);
        resources
    }

    /// Set a resource's state, returning the previous state
    pub fn set_resource_state(&self, resource_id: &ResourceId, new_state: ResourceState) -> ForgeResult<ResourceState> {
        let mut state = self.state.write();
        let resource = state
            .resources
            .get_mut(resource_id)
            .ok_or_else(|| ForgeError::not_found(format!("resource {}", resource_id)))?;
        Ok(std::mem::replace(&mut resource.state, new_state))
    }

    /// Suspend every resource of a team regardless of current state.
    ///
    /// Returns each resource id with its previous state.
    pub fn suspend_team_resources(&self, team_id: &TeamId) -> Vec<(ResourceId, ResourceState)> {
        let mut state = self.state.write();
        state
            .resources
            .values_mut()
            .filter(|r| r.team_id == *team_id)
            .map(|r| (r.id, std::mem::replace(&mut r.state, ResourceState::Suspended)))
            .collect()
    }

    /// Destroy a resource; it stops counting immediately
    pub fn remove_resource(&self, resource_id: &ResourceId) -> ForgeResult<Resource> {
        self.state
            .write()
            .resources
            .remove(resource_id)
            .ok_or_else(|| ForgeError::not_found(format!("resource {}", resource_id)))
    }
}
