//! IP routes of the default virtual router.

mod manager;

pub use manager::{RouteManager, RouteTraits};
