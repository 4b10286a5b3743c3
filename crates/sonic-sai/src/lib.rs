//! Vendor-neutral hardware adapter API.
//!
//! This crate defines what the control plane needs from a switch adapter and
//! nothing more:
//!
//! - [`types`]: type-safe object ids, [`ObjectType`] and [`AdapterKey`]
//! - [`attribute`]: tagged attribute values and per-family schemas
//! - [`schema`]: the attribute table of every object family
//! - [`api`]: the [`SaiApi`] adapter trait
//! - [`fake`]: [`FakeSai`], an in-memory adapter for tests and simulation
//! - [`error`]: status codes and [`SaiError`]
//!
//! # Example
//!
//! ```
//! use sonic_sai::schema::switch;
//! use sonic_sai::{AttrValue, AttributeSet, FakeSai, ObjectType, SaiApi};
//!
//! let adapter = FakeSai::new();
//! let attrs = AttributeSet::new().with(switch::INIT_SWITCH, AttrValue::Bool(true));
//! let switch_id = adapter.create_object(ObjectType::Switch, 0, &attrs).unwrap();
//! assert_eq!(adapter.get_object_count(ObjectType::Switch).unwrap(), 1);
//! # let _ = switch_id;
//! ```

pub mod api;
pub mod attribute;
pub mod error;
pub mod fake;
pub mod schema;
pub mod types;

pub use api::SaiApi;
pub use attribute::{
    AttrDefault, AttrId, AttrKind, AttrSpec, AttrUsage, AttrValue, AttributeSet, ObjectSchema,
};
pub use error::{SaiError, SaiOp, SaiResult, SaiStatus};
pub use fake::{FakeSai, SaiCall};
pub use types::{
    AdapterKey, NextHopGroupKind, NextHopGroupMemberKind, NextHopGroupMemberOid, NextHopGroupOid,
    NextHopKind, NextHopOid, ObjectType, PortKind, PortOid, RawSaiObjectId, RouteEntry,
    SaiObjectId, SaiObjectKind, SwitchKind, SwitchOid, VirtualRouterKind, VirtualRouterOid,
    VlanKind, VlanMemberKind, VlanMemberOid, VlanOid, NULL_OBJECT_ID,
};
