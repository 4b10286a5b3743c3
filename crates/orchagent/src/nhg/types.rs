//! Next hop and next-hop-set identities.

use serde::{Deserialize, Serialize};
use sonic_types::{InterfaceId, IpAddress};
use std::collections::BTreeSet;
use std::fmt;

/// A neighbor as seen by next-hop resolution: an address on an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NeighborKey {
    pub ip: IpAddress,
    pub interface: InterfaceId,
}

impl NeighborKey {
    pub fn new(ip: IpAddress, interface: InterfaceId) -> Self {
        Self { ip, interface }
    }
}

impl fmt::Display for NeighborKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.ip, self.interface)
    }
}

fn default_weight() -> u32 {
    1
}

/// One path of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NextHop {
    pub ip: IpAddress,
    pub interface: InterfaceId,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl NextHop {
    pub fn new(ip: IpAddress, interface: InterfaceId) -> Self {
        Self {
            ip,
            interface,
            weight: default_weight(),
        }
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// The neighbor this path resolves through.
    pub fn neighbor(&self) -> NeighborKey {
        NeighborKey::new(self.ip, self.interface)
    }
}

impl fmt::Display for NextHop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.ip, self.interface)?;
        if self.weight != 1 {
            write!(f, "*{}", self.weight)?;
        }
        Ok(())
    }
}

/// Set of paths shared by any number of routes. Identifies a next-hop group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NextHopSet(BTreeSet<NextHop>);

impl NextHopSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, next_hop: NextHop) -> bool {
        self.0.insert(next_hop)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NextHop> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, next_hop: &NextHop) -> bool {
        self.0.contains(next_hop)
    }

    /// Distinct neighbors the set depends on, in order.
    pub fn neighbors(&self) -> BTreeSet<NeighborKey> {
        self.0.iter().map(NextHop::neighbor).collect()
    }
}

impl FromIterator<NextHop> for NextHopSet {
    fn from_iter<I: IntoIterator<Item = NextHop>>(iter: I) -> Self {
        NextHopSet(iter.into_iter().collect())
    }
}

impl fmt::Display for NextHopSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for next_hop in &self.0 {
            if !first {
                write!(f, "+")?;
            }
            write!(f, "{}", next_hop)?;
            first = false;
        }
        Ok(())
    }
}
