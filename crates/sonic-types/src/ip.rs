//! IP address and prefix types.
//!
//! Prefixes are normalized on construction: host bits beyond the prefix
//! length are cleared, so `10.1.2.3/8` and `10.0.0.0/8` are the same route
//! identity.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IPv4 or IPv6 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum IpAddress {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

impl IpAddress {
    /// Returns true if this is an IPv4 address.
    pub const fn is_ipv4(&self) -> bool {
        matches!(self, IpAddress::V4(_))
    }

    /// Returns true if this is an IPv6 address.
    pub const fn is_ipv6(&self) -> bool {
        matches!(self, IpAddress::V6(_))
    }

    /// Width of the address family in bits.
    pub const fn bit_width(&self) -> u8 {
        match self {
            IpAddress::V4(_) => 32,
            IpAddress::V6(_) => 128,
        }
    }

    fn masked(&self, prefix_len: u8) -> Self {
        match self {
            IpAddress::V4(addr) => {
                let mask = u32::MAX.checked_shl(32 - u32::from(prefix_len)).unwrap_or(0);
                IpAddress::V4(Ipv4Addr::from(u32::from(*addr) & mask))
            }
            IpAddress::V6(addr) => {
                let mask = u128::MAX.checked_shl(128 - u32::from(prefix_len)).unwrap_or(0);
                IpAddress::V6(Ipv6Addr::from(u128::from(*addr) & mask))
            }
        }
    }
}

impl fmt::Display for IpAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpAddress::V4(addr) => addr.fmt(f),
            IpAddress::V6(addr) => addr.fmt(f),
        }
    }
}

impl FromStr for IpAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<IpAddr>()
            .map(IpAddress::from)
            .map_err(|_| ParseError::InvalidIpAddress(s.to_string()))
    }
}

impl TryFrom<String> for IpAddress {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpAddress> for String {
    fn from(addr: IpAddress) -> Self {
        addr.to_string()
    }
}

impl From<IpAddr> for IpAddress {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => IpAddress::V4(v4),
            IpAddr::V6(v6) => IpAddress::V6(v6),
        }
    }
}

impl From<Ipv4Addr> for IpAddress {
    fn from(addr: Ipv4Addr) -> Self {
        IpAddress::V4(addr)
    }
}

impl From<Ipv6Addr> for IpAddress {
    fn from(addr: Ipv6Addr) -> Self {
        IpAddress::V6(addr)
    }
}

/// A normalized IP prefix in CIDR notation (e.g., 10.0.0.0/24 or 2001:db8::/32).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpPrefix {
    network: IpAddress,
    prefix_len: u8,
}

impl IpPrefix {
    /// Creates a prefix, clearing any host bits of `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix length exceeds the address width.
    pub fn new(address: IpAddress, prefix_len: u8) -> Result<Self, ParseError> {
        if prefix_len > address.bit_width() {
            return Err(ParseError::InvalidIpPrefix(format!(
                "{}/{}: prefix length exceeds {}",
                address,
                prefix_len,
                address.bit_width()
            )));
        }

        Ok(IpPrefix {
            network: address.masked(prefix_len),
            prefix_len,
        })
    }

    /// Returns the network address of this prefix.
    pub const fn network(&self) -> &IpAddress {
        &self.network
    }

    /// Returns the prefix length in bits.
    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns true if this is an IPv4 prefix.
    pub const fn is_ipv4(&self) -> bool {
        self.network.is_ipv4()
    }

    /// Returns true if this is the default route (0.0.0.0/0 or ::/0).
    pub const fn is_default(&self) -> bool {
        self.prefix_len == 0
    }

    /// Returns true if `addr` falls inside this prefix.
    pub fn contains(&self, addr: &IpAddress) -> bool {
        addr.is_ipv4() == self.network.is_ipv4() && addr.masked(self.prefix_len) == self.network
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for IpPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, len_str) = s
            .rsplit_once('/')
            .ok_or_else(|| ParseError::InvalidIpPrefix(s.to_string()))?;

        let address: IpAddress = addr_str.parse()?;
        let prefix_len: u8 = len_str
            .parse()
            .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;

        IpPrefix::new(address, prefix_len)
    }
}

impl TryFrom<String> for IpPrefix {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpPrefix> for String {
    fn from(prefix: IpPrefix) -> Self {
        prefix.to_string()
    }
}
