//! Reverse index from a dependency to the keys that depend on it.
//!
//! The relation is non-owning: the index stores keys, never handles, and the
//! owning manager keeps it in step with its own tables. Iteration order is
//! deterministic so hardware updates driven by the index are reproducible.

use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct DependencyIndex<D, K> {
    dependents: BTreeMap<D, BTreeSet<K>>,
}

impl<D: Ord + Clone, K: Ord + Clone> DependencyIndex<D, K> {
    pub fn new() -> Self {
        Self {
            dependents: BTreeMap::new(),
        }
    }

    /// Records that `key` depends on `dependency`. Returns false if already recorded.
    pub fn add(&mut self, dependency: D, key: K) -> bool {
        self.dependents.entry(dependency).or_default().insert(key)
    }

    /// Forgets one edge; the dependency disappears once nothing depends on it.
    pub fn remove(&mut self, dependency: &D, key: &K) -> bool {
        let Some(keys) = self.dependents.get_mut(dependency) else {
            return false;
        };
        let removed = keys.remove(key);
        if keys.is_empty() {
            self.dependents.remove(dependency);
        }
        removed
    }

    /// Keys depending on `dependency`, in order.
    pub fn dependents(&self, dependency: &D) -> impl Iterator<Item = &K> {
        self.dependents
            .get(dependency)
            .into_iter()
            .flat_map(|keys| keys.iter())
    }

    pub fn has_dependents(&self, dependency: &D) -> bool {
        self.dependents.contains_key(dependency)
    }

    /// Number of distinct dependencies tracked.
    pub fn len(&self) -> usize {
        self.dependents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependents.is_empty()
    }
}

impl<D: Ord + Clone, K: Ord + Clone> Default for DependencyIndex<D, K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fan_out_is_targeted() {
        let mut index: DependencyIndex<&str, u32> = DependencyIndex::new();
        index.add("neighbor-a", 1);
        index.add("neighbor-a", 2);
        index.add("neighbor-b", 3);

        assert_eq!(index.dependents(&"neighbor-a").copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(index.dependents(&"neighbor-b").copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(index.dependents(&"neighbor-c").count(), 0);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut index: DependencyIndex<u8, u8> = DependencyIndex::new();
        assert!(index.add(1, 1));
        assert!(!index.add(1, 1));
        assert_eq!(index.dependents(&1).count(), 1);
    }

    #[test]
    fn test_empty_dependency_dropped() {
        let mut index: DependencyIndex<u8, u8> = DependencyIndex::new();
        index.add(1, 10);
        index.add(1, 11);

        assert!(index.remove(&1, &10));
        assert!(index.has_dependents(&1));
        assert!(index.remove(&1, &11));
        assert!(!index.has_dependents(&1));
        assert!(index.is_empty());
        assert!(!index.remove(&1, &11));
    }
}
