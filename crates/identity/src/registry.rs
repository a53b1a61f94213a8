//! `IdentityStore`: a process-scoped registry guaranteeing that every
//! `Identity` constructed against a given `CubeStore` + key returns the
//! same shared instance (spec §4.5, §5 "Shared-resource policy", §9
//! design note: "a single owned handle passed down through construction"
//! rather than true global process state).

use crate::identity::Identity;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct IdentityStore {
    identities: RwLock<HashMap<String, Arc<Identity>>>,
}

impl IdentityStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Looks up an already-registered `Identity` by its registry key
    /// (spec's "key string"), without constructing anything.
    pub fn get(&self, registry_key: &str) -> Option<Arc<Identity>> {
        self.identities.read().get(registry_key).cloned()
    }

    /// Registers `identity` under `registry_key` unless one is already
    /// present, in which case the existing instance is returned instead
    /// (object-identity guarantee).
    pub fn get_or_register(&self, registry_key: String, identity: Arc<Identity>) -> Arc<Identity> {
        let mut map = self.identities.write();
        map.entry(registry_key).or_insert(identity).clone()
    }

    pub fn unregister(&self, registry_key: &str) {
        self.identities.write().remove(registry_key);
    }

    pub fn len(&self) -> usize {
        self.identities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::test_support::bare_identity_for_tests;

    #[test]
    fn get_or_register_returns_same_instance() {
        let registry = IdentityStore::new();
        let id_a = bare_identity_for_tests();
        let first = registry.get_or_register("alice".into(), id_a.clone());
        let id_b = bare_identity_for_tests();
        let second = registry.get_or_register("alice".into(), id_b);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &id_a));
    }

    #[test]
    fn unregister_drops_the_entry() {
        let registry = IdentityStore::new();
        let id = bare_identity_for_tests();
        registry.get_or_register("bob".into(), id);
        assert_eq!(registry.len(), 1);
        registry.unregister("bob");
        assert!(registry.is_empty());
    }
}
