//! Feature flag registry

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize)]
struct Flag {
    enabled: bool,
    public: bool,
}

/// Named feature flags. Public flags are exposed to clients.
#[derive(Default)]
pub struct FeatureRegistry {
    flags: RwLock<BTreeMap<String, Flag>>,
}

impl FeatureRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or overwrite a flag
    pub fn register(&self, name: &str, enabled: bool, public: bool) {
        tracing::debug!(feature = name, enabled, public, "feature registered");
        self.flags.write().insert(name.to_string(), Flag { enabled, public });
    }

    /// Flip an existing flag; unknown names are registered as private
    pub fn set_enabled(&self, name: &str, enabled: bool) {
        let mut flags = self.flags.write();
        flags
            .entry(name.to_string())
            .and_modify(|f| f.enabled = enabled)
            .or_insert(Flag { enabled, public: false });
    }

    /// Whether the flag is registered and on
    pub fn is_enabled(&self, name: &str) -> bool {
        self.flags.read().get(name).map(|f| f.enabled).unwrap_or(false)
    }

    /// Public flags and their state
    pub fn public_flags(&self) -> BTreeMap<String, bool> {
        self.flags
            .read()
            .iter()
            .filter(|(_, f)| f.public)
            .map(|(name, f)| (name.clone(), f.enabled))
            .collect()
    }
}
