//! An insertion-ordered, idempotent set of 32-byte keys, backing
//! `addPost`/`addPublicSubscription` (spec §4.5, §8 "Idempotent sets").

use std::collections::HashSet;

#[derive(Default, Clone)]
pub struct KeySet {
    order: Vec<[u8; 32]>,
    members: HashSet<[u8; 32]>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `key` was newly added.
    pub fn insert(&mut self, key: [u8; 32]) -> bool {
        if self.members.insert(key) {
            self.order.push(key);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, key: &[u8; 32]) -> bool {
        self.members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn keys(&self) -> Vec<[u8; 32]> {
        self.order.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_is_idempotent() {
        let mut set = KeySet::new();
        assert!(set.insert([1u8; 32]));
        assert!(!set.insert([1u8; 32]));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn preserves_insertion_order() {
        let mut set = KeySet::new();
        set.insert([3u8; 32]);
        set.insert([1u8; 32]);
        set.insert([2u8; 32]);
        assert_eq!(set.keys(), vec![[3u8; 32], [1u8; 32], [2u8; 32]]);
    }
}
