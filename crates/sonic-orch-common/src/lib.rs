//! Common orchestration building blocks.
//!
//! Every hardware manager in the agent is assembled from the same parts:
//!
//! - [`ObjectStore`]: owns the hardware objects of one family and reconciles
//!   them with the adapter through [`ObjectTraits`]
//! - [`RefMap`]: reference-counted sharing that never creates entries
//!   implicitly
//! - [`DependencyIndex`]: reverse index from a dependency to the keys that
//!   rely on it, for targeted fan-out
//!
//! # Example
//!
//! ```
//! use sonic_orch_common::{DependencyIndex, RefMap, RefRelease};
//!
//! let mut groups: RefMap<&str, u64> = RefMap::new();
//! groups.insert_new("a+b", 0x10).unwrap();
//! groups.inc_ref(&"a+b").unwrap();
//!
//! let mut users: DependencyIndex<&str, &str> = DependencyIndex::new();
//! users.add("a", "a+b");
//! users.add("b", "a+b");
//! assert_eq!(users.dependents(&"a").count(), 1);
//!
//! assert_eq!(groups.dec_ref(&"a+b"), Ok(RefRelease::Remaining(1)));
//! ```

mod dependency;
mod ref_map;
mod store;

pub use dependency::DependencyIndex;
pub use ref_map::{RefMap, RefMapError, RefRelease};
pub use store::{create_oid_object, ObjectStore, ObjectTraits, SaiObject, StoreStats};
