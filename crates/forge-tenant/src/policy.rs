//! Policy Store
//!
//! Team types are published as immutable snapshots. Editing a team type swaps
//! in a whole new properties blob; readers holding the previous `Arc` keep a
//! consistent view.

use forge_common::{ForgeError, ForgeResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{TeamType, TeamTypeId, TeamTypeProperties};

/// Versioned team type definitions
pub struct PolicyStore {
    policies: RwLock<HashMap<TeamTypeId, Arc<TeamType>>>,
    next_id: RwLock<TeamTypeId>,
}

impl PolicyStore {
    /// Empty store
    pub fn new() -> Self {
        Self {
            policies: RwLock::new(HashMap::new()),
            next_id: RwLock::new(1),
        }
    }

    /// Publish a new team type
    pub fn create(&self, name: &str, order: u32, properties: TeamTypeProperties) -> Arc<TeamType> {
        let id = {
            let mut next = self.next_id.write();
            let id = *next;
            *next += 1;
            id
        };
        let team_type = Arc::new(TeamType {
            id,
            name: name.to_string(),
            description: String::new(),
            active: true,
            order,
            properties,
        });
        self.policies.write().insert(id, team_type.clone());

        tracing::info!(team_type = id, name, "team type published");
        team_type
    }

    /// Current snapshot of a team type
    pub fn get_policy(&self, id: TeamTypeId) -> ForgeResult<Arc<TeamType>> {
        self.policies
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| ForgeError::not_found(format!("team type {}", id)))
    }

    /// Replace the properties blob of a team type
    pub fn replace_properties(
        &self,
        id: TeamTypeId,
        properties: TeamTypeProperties,
    ) -> ForgeResult<Arc<TeamType>> {
        let mut policies = self.policies.write();
        let current = policies
            .get(&id)
            .ok_or_else(|| ForgeError::not_found(format!("team type {}", id)))?;

        let replaced = Arc::new(TeamType {
            properties,
            ..(**current).clone()
        });
        policies.insert(id, replaced.clone());

        tracing::info!(team_type = id, "team type properties replaced");
        Ok(replaced)
    }

    /// Team types by rank
    pub fn list(&self) -> Vec<Arc<TeamType>> {
        let mut types: Vec<_> = self.policies.read().values().cloned().collect();
        types.sort_by_key(|t| (t.order, t.id));
        types
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}
