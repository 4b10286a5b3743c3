//! Attribute tables for every object family.
//!
//! Ids are stable: they are persisted in adapter snapshots and must not be
//! renumbered.

use crate::attribute::{AttrDefault, AttrId, AttrKind, AttrSpec, AttrUsage, ObjectSchema};
use crate::types::ObjectType;

macro_rules! attr {
    ($id:expr, $name:literal, $kind:ident, $usage:ident) => {
        AttrSpec {
            id: $id,
            name: $name,
            kind: AttrKind::$kind,
            usage: AttrUsage::$usage,
            default: None,
        }
    };
    ($id:expr, $name:literal, $kind:ident, $usage:ident, $default:expr) => {
        AttrSpec {
            id: $id,
            name: $name,
            kind: AttrKind::$kind,
            usage: AttrUsage::$usage,
            default: Some($default),
        }
    };
}

pub mod switch {
    use super::*;

    pub const INIT_SWITCH: AttrId = AttrId(0);
    pub const HW_INFO: AttrId = AttrId(1);
    pub const SRC_MAC: AttrId = AttrId(2);
    pub const PORT_NUMBER: AttrId = AttrId(3);

    pub static SCHEMA: ObjectSchema = ObjectSchema {
        object_type: ObjectType::Switch,
        attrs: &[
            attr!(INIT_SWITCH, "INIT_SWITCH", Bool, MandatoryCreateOnly),
            attr!(HW_INFO, "HW_INFO", S8List, CreateOnly),
            attr!(SRC_MAC, "SRC_MAC", Mac, CreateAndSet, AttrDefault::ZeroMac),
            attr!(PORT_NUMBER, "PORT_NUMBER", U32, ReadOnly),
        ],
    };
}

pub mod port {
    use super::*;

    pub const HW_LANE_LIST: AttrId = AttrId(0);
    pub const SPEED: AttrId = AttrId(1);
    pub const ADMIN_STATE: AttrId = AttrId(2);
    pub const FEC_MODE: AttrId = AttrId(3);
    pub const INTERNAL_LOOPBACK_MODE: AttrId = AttrId(4);
    /// Link-state scanning of the port's serdes.
    pub const LINK_SCAN_ENABLE: AttrId = AttrId(5);
    /// Serdes lanes driven by this port; only meaningful on a controlling port.
    pub const ACTIVE_LANES: AttrId = AttrId(6);
    pub const OPER_STATUS: AttrId = AttrId(7);

    pub static SCHEMA: ObjectSchema = ObjectSchema {
        object_type: ObjectType::Port,
        attrs: &[
            attr!(HW_LANE_LIST, "HW_LANE_LIST", U32List, MandatoryCreateOnly),
            attr!(SPEED, "SPEED", U32, MandatoryCreateAndSet),
            attr!(ADMIN_STATE, "ADMIN_STATE", Bool, CreateAndSet, AttrDefault::Bool(false)),
            attr!(FEC_MODE, "FEC_MODE", S32, CreateAndSet, AttrDefault::S32(0)),
            attr!(
                INTERNAL_LOOPBACK_MODE,
                "INTERNAL_LOOPBACK_MODE",
                S32,
                CreateAndSet,
                AttrDefault::S32(0)
            ),
            attr!(
                LINK_SCAN_ENABLE,
                "LINK_SCAN_ENABLE",
                Bool,
                CreateAndSet,
                AttrDefault::Bool(true)
            ),
            attr!(ACTIVE_LANES, "ACTIVE_LANES", U32, CreateAndSet, AttrDefault::U32(1)),
            attr!(OPER_STATUS, "OPER_STATUS", S32, ReadOnly, AttrDefault::S32(0)),
        ],
    };
}

pub mod virtual_router {
    use super::*;

    pub const SRC_MAC: AttrId = AttrId(0);

    pub static SCHEMA: ObjectSchema = ObjectSchema {
        object_type: ObjectType::VirtualRouter,
        attrs: &[attr!(SRC_MAC, "SRC_MAC", Mac, CreateAndSet, AttrDefault::ZeroMac)],
    };
}

pub mod vlan {
    use super::*;

    pub const VLAN_ID: AttrId = AttrId(0);
    pub const MEMBER_LIST: AttrId = AttrId(1);

    pub static SCHEMA: ObjectSchema = ObjectSchema {
        object_type: ObjectType::Vlan,
        attrs: &[
            attr!(VLAN_ID, "VLAN_ID", U16, MandatoryCreateOnly),
            attr!(MEMBER_LIST, "MEMBER_LIST", OidList, ReadOnly, AttrDefault::EmptyOidList),
        ],
    };
}

pub mod vlan_member {
    use super::*;

    pub const VLAN_ID: AttrId = AttrId(0);
    pub const PORT_ID: AttrId = AttrId(1);
    pub const TAGGING_MODE: AttrId = AttrId(2);

    pub const TAGGING_MODE_UNTAGGED: i32 = 0;
    pub const TAGGING_MODE_TAGGED: i32 = 1;

    pub static SCHEMA: ObjectSchema = ObjectSchema {
        object_type: ObjectType::VlanMember,
        attrs: &[
            attr!(VLAN_ID, "VLAN_ID", Oid, MandatoryCreateOnly),
            attr!(PORT_ID, "PORT_ID", Oid, MandatoryCreateOnly),
            attr!(
                TAGGING_MODE,
                "TAGGING_MODE",
                S32,
                CreateAndSet,
                AttrDefault::S32(TAGGING_MODE_UNTAGGED)
            ),
        ],
    };
}

pub mod next_hop {
    use super::*;

    pub const IP: AttrId = AttrId(0);
    pub const INTERFACE_ID: AttrId = AttrId(1);
    pub const DST_MAC: AttrId = AttrId(2);

    pub static SCHEMA: ObjectSchema = ObjectSchema {
        object_type: ObjectType::NextHop,
        attrs: &[
            attr!(IP, "IP", Ip, MandatoryCreateOnly),
            attr!(INTERFACE_ID, "INTERFACE_ID", U32, MandatoryCreateOnly),
            attr!(DST_MAC, "DST_MAC", Mac, MandatoryCreateAndSet),
        ],
    };
}

pub mod next_hop_group {
    use super::*;

    pub const TYPE: AttrId = AttrId(0);
    pub const MEMBER_LIST: AttrId = AttrId(1);

    pub const TYPE_ECMP: i32 = 0;

    pub static SCHEMA: ObjectSchema = ObjectSchema {
        object_type: ObjectType::NextHopGroup,
        attrs: &[
            attr!(TYPE, "TYPE", S32, MandatoryCreateOnly),
            attr!(MEMBER_LIST, "MEMBER_LIST", OidList, ReadOnly, AttrDefault::EmptyOidList),
        ],
    };
}

pub mod next_hop_group_member {
    use super::*;

    pub const NEXT_HOP_GROUP_ID: AttrId = AttrId(0);
    pub const NEXT_HOP_IP: AttrId = AttrId(1);
    pub const NEXT_HOP_INTERFACE: AttrId = AttrId(2);
    /// Forwarding target of the member; null drops traffic hashed to it.
    pub const NEXT_HOP_ID: AttrId = AttrId(3);
    pub const WEIGHT: AttrId = AttrId(4);

    pub static SCHEMA: ObjectSchema = ObjectSchema {
        object_type: ObjectType::NextHopGroupMember,
        attrs: &[
            attr!(NEXT_HOP_GROUP_ID, "NEXT_HOP_GROUP_ID", Oid, MandatoryCreateOnly),
            attr!(NEXT_HOP_IP, "NEXT_HOP_IP", Ip, MandatoryCreateOnly),
            attr!(NEXT_HOP_INTERFACE, "NEXT_HOP_INTERFACE", U32, MandatoryCreateOnly),
            attr!(NEXT_HOP_ID, "NEXT_HOP_ID", Oid, MandatoryCreateAndSet),
            attr!(WEIGHT, "WEIGHT", U32, CreateAndSet, AttrDefault::U32(1)),
        ],
    };
}

pub mod route {
    use super::*;

    pub const PACKET_ACTION: AttrId = AttrId(0);
    pub const NEXT_HOP_ID: AttrId = AttrId(1);

    pub const PACKET_ACTION_DROP: i32 = 0;
    pub const PACKET_ACTION_FORWARD: i32 = 1;
    pub const PACKET_ACTION_TRAP: i32 = 4;

    pub static SCHEMA: ObjectSchema = ObjectSchema {
        object_type: ObjectType::Route,
        attrs: &[
            attr!(
                PACKET_ACTION,
                "PACKET_ACTION",
                S32,
                CreateAndSet,
                AttrDefault::S32(PACKET_ACTION_FORWARD)
            ),
            attr!(NEXT_HOP_ID, "NEXT_HOP_ID", Oid, CreateAndSet, AttrDefault::NullOid),
        ],
    };
}

impl ObjectType {
    /// The attribute table of this family.
    pub fn schema(&self) -> &'static ObjectSchema {
        match self {
            ObjectType::Switch => &switch::SCHEMA,
            ObjectType::Port => &port::SCHEMA,
            ObjectType::VirtualRouter => &virtual_router::SCHEMA,
            ObjectType::Vlan => &vlan::SCHEMA,
            ObjectType::VlanMember => &vlan_member::SCHEMA,
            ObjectType::NextHop => &next_hop::SCHEMA,
            ObjectType::NextHopGroup => &next_hop_group::SCHEMA,
            ObjectType::NextHopGroupMember => &next_hop_group_member::SCHEMA,
            ObjectType::Route => &route::SCHEMA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_schema_ids_unique_and_types_match() {
        for object_type in ObjectType::ALL {
            let schema = object_type.schema();
            assert_eq!(schema.object_type, object_type);
            let ids: HashSet<_> = schema.attrs.iter().map(|spec| spec.id).collect();
            assert_eq!(ids.len(), schema.attrs.len(), "{object_type}");
        }
    }

    #[test]
    fn test_settable_optional_attributes_have_defaults() {
        for object_type in ObjectType::ALL {
            for spec in object_type.schema().attrs {
                if spec.usage == AttrUsage::CreateAndSet {
                    assert!(spec.default.is_some(), "{}.{}", object_type, spec.name);
                }
            }
        }
    }

    #[test]
    fn test_defaults_match_declared_kind() {
        for object_type in ObjectType::ALL {
            for spec in object_type.schema().attrs {
                if let Some(default) = spec.default {
                    assert_eq!(default.to_value().kind(), spec.kind, "{}", spec.name);
                }
            }
        }
    }
}
