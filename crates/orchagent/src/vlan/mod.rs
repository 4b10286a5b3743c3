//! VLANs and their port memberships.

mod manager;

pub use manager::{VlanHandle, VlanManager, VlanMemberTraits, VlanTraits};
