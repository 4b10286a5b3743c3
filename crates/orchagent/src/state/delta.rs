use super::types::{NeighborConfig, PortConfig, RouteConfig, RouteKey, SwitchState, VlanConfig};
use crate::nhg::NeighborKey;
use sonic_types::{MacAddress, PortId, VlanId};
use std::collections::BTreeMap;

/// How one entity differs between two states.
#[derive(Debug, PartialEq, Eq)]
pub enum DeltaValue<'a, V> {
    Added(&'a V),
    Removed(&'a V),
    Changed { old: &'a V, new: &'a V },
}

impl<'a, V> DeltaValue<'a, V> {
    pub fn before(&self) -> Option<&'a V> {
        match self {
            DeltaValue::Added(_) => None,
            DeltaValue::Removed(old) | DeltaValue::Changed { old, .. } => Some(*old),
        }
    }

    pub fn after(&self) -> Option<&'a V> {
        match self {
            DeltaValue::Removed(_) => None,
            DeltaValue::Added(new) | DeltaValue::Changed { new, .. } => Some(*new),
        }
    }

    pub fn is_removed(&self) -> bool {
        matches!(self, DeltaValue::Removed(_))
    }
}

impl<V> Clone for DeltaValue<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for DeltaValue<'_, V> {}

/// Entries that differ between two maps, in key order.
pub fn map_delta<'a, K: Ord, V: PartialEq>(
    old: &'a BTreeMap<K, V>,
    new: &'a BTreeMap<K, V>,
) -> Vec<(&'a K, DeltaValue<'a, V>)> {
    let mut changes: BTreeMap<&'a K, DeltaValue<'a, V>> = BTreeMap::new();
    for (key, old_value) in old {
        match new.get(key) {
            None => {
                changes.insert(key, DeltaValue::Removed(old_value));
            }
            Some(new_value) if new_value != old_value => {
                changes.insert(
                    key,
                    DeltaValue::Changed {
                        old: old_value,
                        new: new_value,
                    },
                );
            }
            Some(_) => {}
        }
    }
    for (key, new_value) in new {
        if !old.contains_key(key) {
            changes.insert(key, DeltaValue::Added(new_value));
        }
    }
    changes.into_iter().collect()
}

/// The difference between two switch states.
#[derive(Debug, Clone, Copy)]
pub struct StateDelta<'a> {
    old: &'a SwitchState,
    new: &'a SwitchState,
}

impl<'a> StateDelta<'a> {
    pub fn new(old: &'a SwitchState, new: &'a SwitchState) -> Self {
        Self { old, new }
    }

    pub fn old_state(&self) -> &'a SwitchState {
        self.old
    }

    pub fn new_state(&self) -> &'a SwitchState {
        self.new
    }

    /// The new source MAC, if it changed.
    pub fn src_mac(&self) -> Option<MacAddress> {
        (self.old.src_mac != self.new.src_mac).then_some(self.new.src_mac)
    }

    pub fn ports(&self) -> Vec<(&'a PortId, DeltaValue<'a, PortConfig>)> {
        map_delta(&self.old.ports, &self.new.ports)
    }

    pub fn vlans(&self) -> Vec<(&'a VlanId, DeltaValue<'a, VlanConfig>)> {
        map_delta(&self.old.vlans, &self.new.vlans)
    }

    pub fn neighbors(&self) -> Vec<(&'a NeighborKey, DeltaValue<'a, NeighborConfig>)> {
        map_delta(&self.old.neighbors, &self.new.neighbors)
    }

    pub fn routes(&self) -> Vec<(&'a RouteKey, DeltaValue<'a, RouteConfig>)> {
        map_delta(&self.old.routes, &self.new.routes)
    }

    pub fn is_empty(&self) -> bool {
        self.old == self.new
    }
}
