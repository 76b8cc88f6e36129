//! Inflight transitions
//!
//! A resource whose local state has flipped but whose infrastructure action
//! has not finished carries a transitional marker here until it does. Every
//! marker is stamped with a generation so that only the action which set it
//! can clear it.

use dashmap::DashMap;
use forge_common::ResourceId;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transitional state shown next to a resource while its action runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InflightState {
    /// Start or create dispatched to the driver
    Starting,
    /// Suspend dispatched to the driver
    Suspending,
}

/// Markers keyed by resource
#[derive(Default)]
pub struct InflightRegistry {
    states: DashMap<ResourceId, (InflightState, u64)>,
    generation: AtomicU64,
}

impl InflightRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a resource, replacing any older marker. Returns the generation
    /// the caller must present to clear it.
    pub fn set(&self, resource_id: ResourceId, state: InflightState) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.states.insert(resource_id, (state, generation));
        generation
    }

    /// Current marker, if any
    pub fn get(&self, resource_id: &ResourceId) -> Option<InflightState> {
        self.states.get(resource_id).map(|entry| entry.0)
    }

    /// Clear the marker only if it is still the one stamped `generation`
    pub fn clear(&self, resource_id: &ResourceId, generation: u64) -> bool {
        self.states
            .remove_if(resource_id, |_, (_, current)| *current == generation)
            .is_some()
    }

    /// Drop whatever marker the resource has
    pub fn remove(&self, resource_id: &ResourceId) {
        self.states.remove(resource_id);
    }

    /// Resources with a marker
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True when no action is outstanding
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
