//! SONiC Orchagent - hardware reconciliation core
//!
//! Translates complete desired switch states into calls on a hardware
//! adapter, diffing against what is already programmed so unchanged objects
//! are never touched.
//!
//! # Architecture
//!
//! ```text
//! [SwitchState] ──> [OrchDaemon] ──> [HwSwitch] ──> [ManagerTable] ──> [SaiApi]
//!                        │               │
//!                   SwitchUpdate    [PortGroup] ──> [Platform]
//! ```
//!
//! # Key Components
//!
//! - [`daemon::OrchDaemon`]: strictly ordered update loop
//! - [`hw_switch::HwSwitch`]: validates and applies state deltas
//! - [`manager_table::ManagerTable`]: one manager per hardware object family
//! - [`ports::PortGroup`]: lane mode control for four-port groups

pub mod audit;
pub mod config;
pub mod daemon;
pub mod error;
pub mod hw_switch;
pub mod manager_table;
pub mod neigh;
pub mod nhg;
pub mod platform;
pub mod ports;
pub mod route;
pub mod state;
pub mod switch;
pub mod vlan;
pub mod vrf;

pub use error::{ErrorClass, ManagerError, ManagerResult};
pub use hw_switch::{BootType, HwSwitch, HwSwitchError};
