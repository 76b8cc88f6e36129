//! Team Entitlements and Limit Enforcement
//!
//! Answers "is this action allowed for this team" from the team's current team
//! type and live resource counts, and simulates team type changes.

use forge_common::{ForgeError, ForgeResult, Limit, TeamId, ViolationCode, ViolationSet};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::{InstanceTypeCatalog, InstanceTypeRef};
use crate::model::{Device, InstanceTypeId, Resource, TeamRole, TeamType, TeamTypeId};
use crate::policy::PolicyStore;
use crate::store::{TeamUsage, TenantStore};

/// Whether one more instance of `instance_type` may be created under `policy`
pub fn check_create(policy: &TeamType, usage: &TeamUsage, instance_type: InstanceTypeId) -> ForgeResult<()> {
    let entry = policy.properties.instance_limit(instance_type);
    if !entry.active {
        return Err(ForgeError::limit_reached(
            "instance_type_unavailable",
            format!("instance type {} is not available for this team", instance_type),
        ));
    }

    let limit = entry.effective();
    let count = usage.instances_of(instance_type);
    if !limit.allows_another(count) {
        return Err(ForgeError::limit_reached(
            "instance_limit_reached",
            format!("instance limit of {} reached for type {}", limit, instance_type),
        ));
    }
    Ok(())
}

/// Whether one more seat fits `limit` with `count` taken
fn check_seat(code: ViolationCode, what: &str, limit: Limit, count: u64) -> ForgeResult<()> {
    if limit.allows_another(count) {
        return Ok(());
    }
    Err(ForgeError::limit_reached(code.as_str(), format!("{} limit of {} reached", what, limit)))
}

/// Whether one more member may join under `policy`
pub fn check_member_add(policy: &TeamType, usage: &TeamUsage) -> ForgeResult<()> {
    check_seat(ViolationCode::MemberLimitReached, "member", policy.properties.users.as_limit(), usage.members)
}

/// Whether one more device may be registered under `policy`
pub fn check_device_add(policy: &TeamType, usage: &TeamUsage) -> ForgeResult<()> {
    check_seat(ViolationCode::DeviceLimitReached, "device", policy.properties.devices.as_limit(), usage.devices)
}

/// Every dimension in which `usage` exceeds `candidate`
pub fn team_type_violations(
    candidate: &TeamType,
    usage: &TeamUsage,
    hashid: impl Fn(InstanceTypeId) -> String,
) -> ViolationSet {
    let properties = &candidate.properties;
    let mut violations = ViolationSet::new();

    violations
        .check(ViolationCode::DeviceLimitReached, properties.devices.as_limit(), usage.devices)
        .check(ViolationCode::MemberLimitReached, properties.users.as_limit(), usage.members);

    for (instance_type, count) in &usage.instances {
        let limit = properties.instance_limit(*instance_type).effective();
        violations.check_instance(&hashid(*instance_type), limit, *count);
    }
    violations
}

/// Entitlement evaluator over the shared stores
pub struct EntitlementEvaluator {
    catalog: Arc<InstanceTypeCatalog>,
    policies: Arc<PolicyStore>,
    store: Arc<TenantStore>,
}

impl EntitlementEvaluator {
    /// Evaluator over the shared catalog, team types and tenant store
    pub fn new(catalog: Arc<InstanceTypeCatalog>, policies: Arc<PolicyStore>, store: Arc<TenantStore>) -> Self {
        Self {
            catalog,
            policies,
            store,
        }
    }

    /// Team type and usage read together
    fn snapshot(&self, team_id: &TeamId) -> ForgeResult<(Arc<TeamType>, TeamUsage)> {
        let usage = self.store.usage(team_id)?;
        let policy = self.policies.get_policy(usage.team.team_type_id)?;
        Ok((policy, usage))
    }

    fn resolve(&self, instance_type: impl Into<InstanceTypeRef>) -> ForgeResult<InstanceTypeId> {
        self.catalog.resolve(&instance_type.into())
    }

    /// Instance type catalog
    pub fn catalog(&self) -> &InstanceTypeCatalog {
        &self.catalog
    }

    /// Tenant store the checks read
    pub fn store(&self) -> &TenantStore {
        &self.store
    }

    /// The team type a team currently points at
    pub fn team_policy(&self, team_id: &TeamId) -> ForgeResult<Arc<TeamType>> {
        Ok(self.snapshot(team_id)?.0)
    }

    /// Live resources of the team, optionally of one instance type
    pub fn instance_count(&self, team_id: &TeamId, instance_type: Option<InstanceTypeRef>) -> ForgeResult<u64> {
        let usage = self.store.usage(team_id)?;
        match instance_type {
            Some(instance_type) => Ok(usage.instances_of(self.resolve(instance_type)?)),
            None => Ok(usage.total_instances()),
        }
    }

    /// Live resources of the team grouped by instance type
    pub fn instance_count_by_type(&self, team_id: &TeamId) -> ForgeResult<BTreeMap<InstanceTypeId, u64>> {
        Ok(self.store.usage(team_id)?.instances)
    }

    /// User limit of the team's type
    pub fn user_limit(&self, team_id: &TeamId) -> ForgeResult<Limit> {
        Ok(self.snapshot(team_id)?.0.properties.users.as_limit())
    }

    /// Device limit of the team's type
    pub fn device_limit(&self, team_id: &TeamId) -> ForgeResult<Limit> {
        Ok(self.snapshot(team_id)?.0.properties.devices.as_limit())
    }

    /// Whether the team's type offers `instance_type` at all
    pub fn is_instance_type_available(
        &self,
        team_id: &TeamId,
        instance_type: impl Into<InstanceTypeRef>,
    ) -> ForgeResult<bool> {
        let id = self.resolve(instance_type)?;
        let (policy, _) = self.snapshot(team_id)?;
        Ok(policy.properties.instance_limit(id).active)
    }

    /// Zero when the type is inactive or absent from the policy
    pub fn instance_type_limit(
        &self,
        team_id: &TeamId,
        instance_type: impl Into<InstanceTypeRef>,
    ) -> ForgeResult<Limit> {
        let id = self.resolve(instance_type)?;
        let (policy, _) = self.snapshot(team_id)?;
        Ok(policy.properties.instance_limit(id).effective())
    }

    /// Whether one more instance fits the team's type
    pub fn check_instance_type_create_allowed(
        &self,
        team_id: &TeamId,
        instance_type: impl Into<InstanceTypeRef>,
    ) -> ForgeResult<()> {
        let id = self.resolve(instance_type)?;
        let (policy, usage) = self.snapshot(team_id)?;
        check_create(&policy, &usage, id)
    }

    /// Starting an existing resource does not take a new slot, so policy
    /// limits never block it. Trial and billing state are gated elsewhere.
    pub fn check_instance_start_allowed(
        &self,
        _team_id: &TeamId,
        _instance_type: impl Into<InstanceTypeRef>,
    ) -> ForgeResult<()> {
        Ok(())
    }

    /// Create a resource, checking limits against the same snapshot the
    /// insert happens under
    pub fn create_checked(&self, resource: Resource) -> ForgeResult<Resource> {
        let team = self.store.team(&resource.team_id)?;
        let policy = self.policies.get_policy(team.team_type_id)?;
        let instance_type = resource.instance_type;
        self.store.insert_resource_checked(resource, |usage| {
            if usage.team.team_type_id != policy.id {
                // team type changed between reads; evaluate against the new one
                let current = self.policies.get_policy(usage.team.team_type_id)?;
                return check_create(&current, usage, instance_type);
            }
            check_create(&policy, usage, instance_type)
        })
    }

    /// Add a member or change an existing member's role, checking the user
    /// limit for new seats under the insert's write lock
    pub fn add_member_checked(&self, team_id: &TeamId, user_id: Uuid, role: TeamRole) -> ForgeResult<()> {
        self.store.insert_member_checked(team_id, user_id, role, |usage| {
            let policy = self.policies.get_policy(usage.team.team_type_id)?;
            check_member_add(&policy, usage)
        })
    }

    /// Register a device, checking the device limit under the insert's write lock
    pub fn add_device_checked(&self, team_id: &TeamId, name: &str) -> ForgeResult<Device> {
        self.store.insert_device_checked(team_id, name, |usage| {
            let policy = self.policies.get_policy(usage.team.team_type_id)?;
            check_device_add(&policy, usage)
        })
    }

    /// Simulate moving the team to `candidate`; fails with every violation
    pub fn check_team_type_update_allowed(&self, team_id: &TeamId, candidate: &TeamType) -> ForgeResult<()> {
        let usage = self.store.usage(team_id)?;
        let violations = team_type_violations(candidate, &usage, |id| self.catalog.hashid(id));
        if !violations.is_empty() {
            tracing::info!(
                team = %team_id,
                team_type = candidate.id,
                violations = violations.len(),
                "team type change rejected"
            );
        }
        violations.into_result()
    }

    /// Apply a team type unconditionally; callers check first
    pub fn update_team_type(&self, team_id: &TeamId, team_type_id: TeamTypeId) -> ForgeResult<TeamTypeId> {
        self.policies.get_policy(team_type_id)?;
        let previous = self.store.set_team_type(team_id, team_type_id)?;
        tracing::info!(team = %team_id, from = previous, to = team_type_id, "team type updated");
        Ok(previous)
    }
}
