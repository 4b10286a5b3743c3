//! Logical identities used as keys in desired switch state.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $inner:ty, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            pub const fn new(id: $inner) -> Self {
                $name(id)
            }

            pub const fn as_raw(&self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "{}"), self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                $name(id)
            }
        }
    };
}

define_id!(
    /// Software identity of a front-panel port.
    PortId,
    u32,
    "port"
);
define_id!(
    /// Virtual router (VRF) identity. Router 0 is the default router.
    RouterId,
    u32,
    "vrf"
);
define_id!(
    /// Layer-3 interface identity that neighbors and next hops hang off.
    InterfaceId,
    u32,
    "intf"
);

impl RouterId {
    pub const DEFAULT: RouterId = RouterId(0);
}

/// IEEE 802.1Q VLAN identifier, valid in 1..=4094.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4094;

    pub fn new(id: u16) -> Result<Self, ParseError> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(VlanId(id))
        } else {
            Err(ParseError::InvalidVlanId(id))
        }
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vlan{}", self.0)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        VlanId::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(id: VlanId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vlan_range() {
        assert!(VlanId::new(0).is_err());
        assert!(VlanId::new(1).is_ok());
        assert!(VlanId::new(4094).is_ok());
        assert_eq!(VlanId::new(4095), Err(ParseError::InvalidVlanId(4095)));
    }

    #[test]
    fn test_vlan_serde_validates() {
        assert!(serde_json::from_str::<VlanId>("100").is_ok());
        assert!(serde_json::from_str::<VlanId>("5000").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(PortId::new(3).to_string(), "port3");
        assert_eq!(RouterId::DEFAULT.to_string(), "vrf0");
        assert_eq!(VlanId::new(10).unwrap().to_string(), "Vlan10");
    }
}
