//! Common value types for switch state reconciliation.
//!
//! This crate provides type-safe representations of the network primitives
//! that flow through desired switch state and into hardware attributes:
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`IpAddress`] / [`IpPrefix`]: IPv4 and IPv6 addresses and normalized prefixes
//! - [`PortId`], [`VlanId`], [`RouterId`], [`InterfaceId`]: logical identities
//! - [`PortSpeed`], [`AdminState`], [`FecMode`]: port configuration values

mod ids;
mod ip;
mod mac;
mod port;

pub use ids::{InterfaceId, PortId, RouterId, VlanId};
pub use ip::{IpAddress, IpPrefix};
pub use mac::MacAddress;
pub use port::{AdminState, FecMode, PortSpeed};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),

    #[error("invalid port speed: {0}")]
    InvalidPortSpeed(String),

    #[error("invalid FEC mode: {0}")]
    InvalidFecMode(String),
}
