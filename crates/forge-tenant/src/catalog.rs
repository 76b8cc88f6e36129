//! Instance Type Catalog
//!
//! Instance types are referenced three ways: internal id, external opaque id
//! (hashid) or the full object. [`InstanceTypeCatalog::resolve`] is the one
//! place those are normalized to the internal id.

use forge_common::{ForgeError, ForgeResult};
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::model::{InstanceType, InstanceTypeId};

const HASHID_LEN: usize = 10;

/// Any accepted way of naming an instance type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceTypeRef {
    /// Internal id
    Id(InstanceTypeId),
    /// External id
    Hashid(String),
    /// The instance type itself
    Object(InstanceType),
}

impl From<InstanceTypeId> for InstanceTypeRef {
    fn from(id: InstanceTypeId) -> Self {
        Self::Id(id)
    }
}

impl From<u64> for InstanceTypeRef {
    fn from(id: u64) -> Self {
        Self::Id(InstanceTypeId(id))
    }
}

impl From<&str> for InstanceTypeRef {
    fn from(hashid: &str) -> Self {
        Self::Hashid(hashid.to_string())
    }
}

impl From<String> for InstanceTypeRef {
    fn from(hashid: String) -> Self {
        Self::Hashid(hashid)
    }
}

impl From<InstanceType> for InstanceTypeRef {
    fn from(instance_type: InstanceType) -> Self {
        Self::Object(instance_type)
    }
}

impl From<&InstanceType> for InstanceTypeRef {
    fn from(instance_type: &InstanceType) -> Self {
        Self::Object(instance_type.clone())
    }
}

struct CatalogInner {
    by_id: HashMap<InstanceTypeId, InstanceType>,
    by_hashid: HashMap<String, InstanceTypeId>,
    next_id: u64,
}

/// Registry of instance types
pub struct InstanceTypeCatalog {
    salt: String,
    inner: RwLock<CatalogInner>,
}

impl InstanceTypeCatalog {
    /// Empty catalog; `salt` keys the external ids
    pub fn new(salt: &str) -> Self {
        Self {
            salt: salt.to_string(),
            inner: RwLock::new(CatalogInner {
                by_id: HashMap::new(),
                by_hashid: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Opaque external id for an internal id
    pub fn encode(&self, id: InstanceTypeId) -> String {
        let digest = Sha256::digest(format!("{}:{}", self.salt, id.0).as_bytes());
        let mut hashid = hex::encode(digest);
        hashid.truncate(HASHID_LEN);
        hashid
    }

    /// Register a new instance type
    pub fn create(&self, name: &str, active: bool, order: u32) -> InstanceType {
        let mut inner = self.inner.write();
        let id = InstanceTypeId(inner.next_id);
        inner.next_id += 1;

        let instance_type = InstanceType {
            id,
            hashid: self.encode(id),
            name: name.to_string(),
            active,
            order,
        };
        inner.by_hashid.insert(instance_type.hashid.clone(), id);
        inner.by_id.insert(id, instance_type.clone());

        tracing::info!(instance_type = %instance_type.hashid, name, "instance type created");
        instance_type
    }

    /// Normalize any reference to the internal id
    pub fn resolve(&self, instance_type: &InstanceTypeRef) -> ForgeResult<InstanceTypeId> {
        let inner = self.inner.read();
        let id = match instance_type {
            InstanceTypeRef::Id(id) => Some(*id).filter(|id| inner.by_id.contains_key(id)),
            InstanceTypeRef::Hashid(hashid) => inner.by_hashid.get(hashid).copied(),
            InstanceTypeRef::Object(object) => Some(object.id).filter(|id| inner.by_id.contains_key(id)),
        };
        id.ok_or_else(|| ForgeError::not_found(format!("instance type {:?}", instance_type)))
    }

    /// Instance type by internal id
    pub fn get(&self, id: InstanceTypeId) -> Option<InstanceType> {
        self.inner.read().by_id.get(&id).cloned()
    }

    /// External id for an internal id, falling back to the encoded form
    pub fn hashid(&self, id: InstanceTypeId) -> String {
        self.inner
            .read()
            .by_id
            .get(&id)
            .map(|t| t.hashid.clone())
            .unwrap_or_else(|| self.encode(id))
    }

    /// All instance types by display order
    pub fn list(&self) -> Vec<InstanceType> {
        let mut types: Vec<_> = self.inner.read().by_id.values().cloned().collect();
        types.sort_by_key(|t| (t.order, t.id));
        types
    }
}

impl Default for InstanceTypeCatalog {
    fn default() -> Self {
        Self::new("forge")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_all_forms() {
        let catalog = InstanceTypeCatalog::new("test-salt");
        let small = catalog.create("small", true, 1);
        let _large = catalog.create("large", true, 2);

        assert_eq!(small.hashid.len(), HASHID_LEN);
        assert_eq!(catalog.resolve(&small.id.into()).unwrap(), small.id);
        assert_eq!(catalog.resolve(&small.hashid.as_str().into()).unwrap(), small.id);
        assert_eq!(catalog.resolve(&(&small).into()).unwrap(), small.id);
    }

    #[test]
    fn test_unknown_reference() {
        let catalog = InstanceTypeCatalog::default();
        assert!(matches!(catalog.resolve(&"nope".into()), Err(ForgeError::NotFound(_))));
        assert!(matches!(catalog.resolve(&99u64.into()), Err(ForgeError::NotFound(_))));
    }

    #[test]
    fn test_hashid_is_stable_per_salt() {
        let a = InstanceTypeCatalog::new("one");
        let b = InstanceTypeCatalog::new("one");
        let c = InstanceTypeCatalog::new("two");
        assert_eq!(a.encode(InstanceTypeId(7)), b.encode(InstanceTypeId(7)));
        assert_ne!(a.encode(InstanceTypeId(7)), c.encode(InstanceTypeId(7)));
    }
}
