//! Shared next-hop groups.
//!
//! Routes that forward over the same set of paths share one hardware group.
//! Groups are reference counted by their [`NextHopSet`] and torn down when
//! the last route lets go. Each member remembers the neighbor it resolves
//! through, so a neighbor event touches only the groups that use it.

mod manager;
mod types;

pub use manager::{
    NextHopGroupHandle, NextHopGroupManager, NextHopGroupMemberTraits, NextHopGroupTraits,
};
pub use types::{NeighborKey, NextHop, NextHopSet};
