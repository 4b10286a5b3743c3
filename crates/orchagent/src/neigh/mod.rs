//! Neighbor resolution.
//!
//! A resolved neighbor is programmed as a next-hop object; the next-hop
//! group manager is told about every resolution and loss of resolution so
//! group members can be pointed at, or away from, the neighbor.

mod manager;

pub use manager::{NeighborManager, NextHopTraits};
