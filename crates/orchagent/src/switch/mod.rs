//! Switch instance management.

mod manager;

pub use manager::{SwitchManager, SwitchTraits};
