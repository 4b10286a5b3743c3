//! The sequential update loop that owns a switch.

mod orchdaemon;

pub use orchdaemon::{
    DaemonError, DaemonHandle, DaemonStats, OrchDaemon, OrchDaemonConfig, SwitchUpdate, UpdateReply,
};
