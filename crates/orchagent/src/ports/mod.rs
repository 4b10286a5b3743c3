//! Front-panel ports and the port groups that share serdes lanes.
//!
//! # Architecture
//!
//! ```text
//! SwitchState.ports
//!        │
//!        ▼
//!   PortManager ──────────────> SAI Port objects
//!        ▲
//!        │ LaneControl
//!   PortGroup (4 lanes) ──────> PlatformPort (transceiver hooks)
//! ```
//!
//! A [`PortGroup`] owns no hardware objects of its own. It decides the lane
//! mode of four adjacent ports and drives the disable, reprogram, enable
//! sequence through [`LaneControl`], which in production writes port
//! attributes through the [`PortManager`].

mod manager;
mod port_group;

pub use manager::{PortManager, PortTraits};
pub use port_group::{
    calculate_desired_lane_mode, needed_lane_mode_for_speed, LaneControl, LaneMode, PortGroup,
    PortGroupError, PortManagerLaneControl, PORTS_PER_GROUP,
};
