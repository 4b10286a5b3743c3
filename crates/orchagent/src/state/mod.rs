//! Desired switch state and the deltas between two versions of it.
//!
//! A [`SwitchState`] is a complete, immutable description of what the
//! hardware should be programmed with. The reconciliation driver never
//! mutates one; it compares two and programs the difference.

mod delta;
mod types;

pub use delta::{map_delta, DeltaValue, StateDelta};
pub use types::{
    NeighborConfig, PortConfig, RouteAction, RouteConfig, RouteKey, StateError, SwitchState,
    VlanConfig, VlanTagging,
};
