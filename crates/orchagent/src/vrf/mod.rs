//! Virtual router management.
//!
//! Only the default router exists on this hardware; it is created once and
//! shared by every route.

mod manager;

pub use manager::{VirtualRouterManager, VirtualRouterTraits};
