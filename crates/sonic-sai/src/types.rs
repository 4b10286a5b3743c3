//! Type-safe adapter object ids and adapter keys.
//!
//! Object ids are strongly typed so a port id cannot be handed to an API
//! expecting a next-hop group id. [`AdapterKey`] is the untyped form that
//! crosses the adapter boundary.

use serde::{Deserialize, Serialize};
use sonic_types::IpPrefix;
use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Raw adapter object id (matches `sai_object_id_t`).
pub type RawSaiObjectId = u64;

/// The null object id.
pub const NULL_OBJECT_ID: RawSaiObjectId = 0;

/// Hardware object families known to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectType {
    Switch,
    Port,
    VirtualRouter,
    Vlan,
    VlanMember,
    NextHop,
    NextHopGroup,
    NextHopGroupMember,
    Route,
}

impl ObjectType {
    pub const ALL: [ObjectType; 9] = [
        ObjectType::Switch,
        ObjectType::Port,
        ObjectType::VirtualRouter,
        ObjectType::Vlan,
        ObjectType::VlanMember,
        ObjectType::NextHop,
        ObjectType::NextHopGroup,
        ObjectType::NextHopGroupMember,
        ObjectType::Route,
    ];

    /// Entry objects are identified by their key, not by an adapter-issued id.
    pub const fn is_entry(&self) -> bool {
        matches!(self, ObjectType::Route)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Marker trait for adapter object kinds.
pub trait SaiObjectKind: Send + Sync + 'static {
    const OBJECT_TYPE: ObjectType;
}

/// A type-safe adapter object id.
///
/// ```
/// use sonic_sai::{PortOid, VlanOid};
///
/// let port = PortOid::from_raw(0x1000000000001).unwrap();
/// assert!(port.is_valid());
/// // fn takes_vlan(v: VlanOid) {}
/// // takes_vlan(port);  // does not compile
/// ```
pub struct SaiObjectId<T: SaiObjectKind> {
    raw: RawSaiObjectId,
    _marker: PhantomData<T>,
}

impl<T: SaiObjectKind> SaiObjectId<T> {
    pub const NULL: Self = Self {
        raw: NULL_OBJECT_ID,
        _marker: PhantomData,
    };

    /// Returns `None` for the null id.
    pub fn from_raw(raw: RawSaiObjectId) -> Option<Self> {
        if raw == NULL_OBJECT_ID {
            None
        } else {
            Some(Self::from_raw_unchecked(raw))
        }
    }

    pub const fn from_raw_unchecked(raw: RawSaiObjectId) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// Extracts a typed id from an adapter key of the matching family.
    pub fn from_adapter_key(key: &AdapterKey) -> Option<Self> {
        match key {
            AdapterKey::Object { object_type, oid } if *object_type == T::OBJECT_TYPE => {
                Self::from_raw(*oid)
            }
            _ => None,
        }
    }

    pub const fn as_raw(&self) -> RawSaiObjectId {
        self.raw
    }

    pub const fn is_null(&self) -> bool {
        self.raw == NULL_OBJECT_ID
    }

    pub const fn is_valid(&self) -> bool {
        self.raw != NULL_OBJECT_ID
    }

    pub fn adapter_key(&self) -> AdapterKey {
        AdapterKey::Object {
            object_type: T::OBJECT_TYPE,
            oid: self.raw,
        }
    }
}

impl<T: SaiObjectKind> Clone for SaiObjectId<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: SaiObjectKind> Copy for SaiObjectId<T> {}

impl<T: SaiObjectKind> fmt::Debug for SaiObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:016x})", T::OBJECT_TYPE, self.raw)
    }
}

impl<T: SaiObjectKind> fmt::Display for SaiObjectId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.raw)
    }
}

impl<T: SaiObjectKind> PartialEq for SaiObjectId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: SaiObjectKind> Eq for SaiObjectId<T> {}

impl<T: SaiObjectKind> PartialOrd for SaiObjectId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: SaiObjectKind> Ord for SaiObjectId<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<T: SaiObjectKind> Hash for SaiObjectId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T: SaiObjectKind> Default for SaiObjectId<T> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T: SaiObjectKind> From<SaiObjectId<T>> for AdapterKey {
    fn from(id: SaiObjectId<T>) -> Self {
        id.adapter_key()
    }
}

macro_rules! define_object_kind {
    ($name:ident, $object_type:ident, $oid_alias:ident) => {
        #[doc = concat!("Marker type for ", stringify!($object_type), " objects.")]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl SaiObjectKind for $name {
            const OBJECT_TYPE: ObjectType = ObjectType::$object_type;
        }

        #[doc = concat!("Typed id of a ", stringify!($object_type), " object.")]
        pub type $oid_alias = SaiObjectId<$name>;
    };
}

define_object_kind!(SwitchKind, Switch, SwitchOid);
define_object_kind!(PortKind, Port, PortOid);
define_object_kind!(VirtualRouterKind, VirtualRouter, VirtualRouterOid);
define_object_kind!(VlanKind, Vlan, VlanOid);
define_object_kind!(VlanMemberKind, VlanMember, VlanMemberOid);
define_object_kind!(NextHopKind, NextHop, NextHopOid);
define_object_kind!(NextHopGroupKind, NextHopGroup, NextHopGroupOid);
define_object_kind!(NextHopGroupMemberKind, NextHopGroupMember, NextHopGroupMemberOid);

/// Identity of a route entry; doubles as its adapter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteEntry {
    pub switch_id: RawSaiObjectId,
    pub virtual_router_id: RawSaiObjectId,
    pub destination: IpPrefix,
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "route(vr 0x{:x}, {})",
            self.virtual_router_id, self.destination
        )
    }
}

impl From<RouteEntry> for AdapterKey {
    fn from(entry: RouteEntry) -> Self {
        AdapterKey::Route(entry)
    }
}

/// Handle of a live hardware object, as the adapter sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AdapterKey {
    Object {
        object_type: ObjectType,
        oid: RawSaiObjectId,
    },
    Route(RouteEntry),
}

impl AdapterKey {
    pub const fn object_type(&self) -> ObjectType {
        match self {
            AdapterKey::Object { object_type, .. } => *object_type,
            AdapterKey::Route(_) => ObjectType::Route,
        }
    }

    /// The adapter-issued id, if this is not an entry key.
    pub const fn oid(&self) -> Option<RawSaiObjectId> {
        match self {
            AdapterKey::Object { oid, .. } => Some(*oid),
            AdapterKey::Route(_) => None,
        }
    }
}

impl fmt::Display for AdapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterKey::Object { object_type, oid } => write!(f, "{}:0x{:x}", object_type, oid),
            AdapterKey::Route(entry) => entry.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_oid_creation() {
        let port = PortOid::from_raw(0x1000000000001).unwrap();
        assert_eq!(port.as_raw(), 0x1000000000001);
        assert!(port.is_valid());
        assert!(PortOid::from_raw(0).is_none());
        assert!(PortOid::NULL.is_null());
        assert!(PortOid::default().is_null());
    }

    #[test]
    fn test_adapter_key_round_trip_checks_type() {
        let vlan = VlanOid::from_raw(42).unwrap();
        let key: AdapterKey = vlan.into();
        assert_eq!(key.object_type(), ObjectType::Vlan);
        assert_eq!(VlanOid::from_adapter_key(&key), Some(vlan));
        assert_eq!(PortOid::from_adapter_key(&key), None);
    }

    #[test]
    fn test_route_key_has_no_oid() {
        let key = AdapterKey::Route(RouteEntry {
            switch_id: 1,
            virtual_router_id: 2,
            destination: "10.0.0.0/24".parse().unwrap(),
        });
        assert_eq!(key.object_type(), ObjectType::Route);
        assert_eq!(key.oid(), None);
        assert!(ObjectType::Route.is_entry());
    }

    #[test]
    fn test_debug_format() {
        let nhg = NextHopGroupOid::from_raw(0x10).unwrap();
        assert_eq!(format!("{:?}", nhg), "NextHopGroup(0x0000000000000010)");
    }
}
