//! Reference-counted map that never creates entries implicitly.
//!
//! Shared hardware objects (a next-hop group used by many routes) live in a
//! [`RefMap`]. The first owner inserts the value explicitly; later owners
//! take a reference; the last release hands the value back to the caller so
//! it can tear the hardware object down.

use std::collections::BTreeMap;
use thiserror::Error;

/// Error type for RefMap operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefMapError {
    #[error("Key not found")]
    KeyNotFound,

    #[error("Key already present")]
    AlreadyPresent,
}

/// Outcome of releasing one reference.
#[derive(Debug, PartialEq, Eq)]
pub enum RefRelease<V> {
    /// Other owners remain; carries the new count.
    Remaining(u32),
    /// That was the last reference; the entry has been removed.
    Released(V),
}

#[derive(Debug, Clone)]
struct RefEntry<V> {
    value: V,
    ref_count: u32,
}

/// A map of shared values with explicit reference counting.
///
/// ```
/// use sonic_orch_common::{RefMap, RefRelease};
///
/// let mut map: RefMap<&str, u32> = RefMap::new();
/// assert!(map.inc_ref(&"nhg").is_err());
///
/// map.insert_new("nhg", 7).unwrap();
/// assert_eq!(map.inc_ref(&"nhg"), Ok(2));
/// assert_eq!(map.dec_ref(&"nhg"), Ok(RefRelease::Remaining(1)));
/// assert_eq!(map.dec_ref(&"nhg"), Ok(RefRelease::Released(7)));
/// assert!(map.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RefMap<K, V> {
    inner: BTreeMap<K, RefEntry<V>>,
}

impl<K: Ord, V> RefMap<K, V> {
    pub fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    /// **This never creates entries.**
    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key).map(|entry| &entry.value)
    }

    /// **This never creates entries.**
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.inner.get_mut(key).map(|entry| &mut entry.value)
    }

    /// Returns the reference count, or `None` if the key is absent.
    pub fn ref_count(&self, key: &K) -> Option<u32> {
        self.inner.get(key).map(|entry| entry.ref_count)
    }

    /// Inserts a value owned by exactly one reference.
    pub fn insert_new(&mut self, key: K, value: V) -> Result<&mut V, RefMapError> {
        match self.inner.entry(key) {
            std::collections::btree_map::Entry::Occupied(_) => Err(RefMapError::AlreadyPresent),
            std::collections::btree_map::Entry::Vacant(slot) => Ok(&mut slot
                .insert(RefEntry {
                    value,
                    ref_count: 1,
                })
                .value),
        }
    }

    /// Takes one more reference on an existing entry and returns the new count.
    pub fn inc_ref(&mut self, key: &K) -> Result<u32, RefMapError> {
        let entry = self.inner.get_mut(key).ok_or(RefMapError::KeyNotFound)?;
        entry.ref_count += 1;
        Ok(entry.ref_count)
    }

    /// Drops one reference; the entry is removed and returned at zero.
    pub fn dec_ref(&mut self, key: &K) -> Result<RefRelease<V>, RefMapError> {
        let entry = self.inner.get_mut(key).ok_or(RefMapError::KeyNotFound)?;
        entry.ref_count -= 1;
        if entry.ref_count > 0 {
            return Ok(RefRelease::Remaining(entry.ref_count));
        }
        self.inner
            .remove(key)
            .map(|entry| RefRelease::Released(entry.value))
            .ok_or(RefMapError::KeyNotFound)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter().map(|(key, entry)| (key, &entry.value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.inner.iter_mut().map(|(key, entry)| (key, &mut entry.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.inner.keys()
    }
}

impl<K: Ord, V> Default for RefMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
