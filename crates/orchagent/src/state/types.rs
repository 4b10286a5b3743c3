use crate::nhg::{NeighborKey, NextHopSet};
use serde::{Deserialize, Serialize};
use sonic_types::{
    AdminState, FecMode, InterfaceId, IpAddress, IpPrefix, MacAddress, PortId, PortSpeed,
    RouterId, VlanId,
};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Error type for loading desired state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid switch state: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Collections whose JSON form is a list of self-describing entries.
mod keyed_list {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;
    use std::fmt::Debug;

    pub trait Keyed {
        type Key: Ord + Debug;
        fn key(&self) -> Self::Key;
    }

    pub fn serialize<S, K, V>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        serializer.collect_seq(map.values())
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<V::Key, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Keyed + Deserialize<'de>,
    {
        let mut map = BTreeMap::new();
        for entry in Vec::<V>::deserialize(deserializer)? {
            let key = entry.key();
            if map.contains_key(&key) {
                return Err(D::Error::custom(format!("duplicate entry {:?}", key)));
            }
            map.insert(key, entry);
        }
        Ok(map)
    }
}

use keyed_list::Keyed;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    pub id: PortId,
    pub speed: PortSpeed,
    #[serde(default)]
    pub admin_state: AdminState,
    #[serde(default)]
    pub fec: FecMode,
    #[serde(default)]
    pub loopback: bool,
}

impl PortConfig {
    /// A disabled port at `speed`.
    pub fn new(id: PortId, speed: PortSpeed) -> Self {
        Self {
            id,
            speed,
            admin_state: AdminState::Down,
            fec: FecMode::None,
            loopback: false,
        }
    }

    pub fn enabled(mut self) -> Self {
        self.admin_state = AdminState::Up;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.admin_state.is_up()
    }
}

impl Keyed for PortConfig {
    type Key = PortId;
    fn key(&self) -> PortId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VlanTagging {
    #[default]
    Untagged,
    Tagged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanConfig {
    pub id: VlanId,
    /// Member ports and how frames leave them.
    #[serde(default)]
    pub members: BTreeMap<PortId, VlanTagging>,
}

impl VlanConfig {
    pub fn new(id: VlanId) -> Self {
        Self {
            id,
            members: BTreeMap::new(),
        }
    }

    pub fn with_member(mut self, port: PortId, tagging: VlanTagging) -> Self {
        self.members.insert(port, tagging);
        self
    }
}

impl Keyed for VlanConfig {
    type Key = VlanId;
    fn key(&self) -> VlanId {
        self.id
    }
}

/// A neighbor entry. Without a MAC the neighbor is known but unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborConfig {
    pub ip: IpAddress,
    pub interface: InterfaceId,
    #[serde(default)]
    pub mac: Option<MacAddress>,
}

impl NeighborConfig {
    pub fn resolved(ip: IpAddress, interface: InterfaceId, mac: MacAddress) -> Self {
        Self {
            ip,
            interface,
            mac: Some(mac),
        }
    }

    pub fn unresolved(ip: IpAddress, interface: InterfaceId) -> Self {
        Self {
            ip,
            interface,
            mac: None,
        }
    }

    pub fn key(&self) -> NeighborKey {
        NeighborKey::new(self.ip, self.interface)
    }
}

impl Keyed for NeighborConfig {
    type Key = NeighborKey;
    fn key(&self) -> NeighborKey {
        NeighborConfig::key(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub router: RouterId,
    pub prefix: IpPrefix,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.router, self.prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    Drop,
    ToCpu,
    NextHops(NextHopSet),
}

fn default_router() -> RouterId {
    RouterId::DEFAULT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(default = "default_router")]
    pub router: RouterId,
    pub prefix: IpPrefix,
    pub action: RouteAction,
}

impl RouteConfig {
    pub fn new(prefix: IpPrefix, action: RouteAction) -> Self {
        Self {
            router: RouterId::DEFAULT,
            prefix,
            action,
        }
    }

    pub fn key(&self) -> RouteKey {
        RouteKey {
            router: self.router,
            prefix: self.prefix,
        }
    }
}

impl Keyed for RouteConfig {
    type Key = RouteKey;
    fn key(&self) -> RouteKey {
        RouteConfig::key(self)
    }
}

/// Complete desired configuration of one switch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchState {
    /// Source MAC of routed traffic; zero leaves the hardware default.
    #[serde(default)]
    pub src_mac: MacAddress,
    #[serde(default, with = "keyed_list")]
    pub ports: BTreeMap<PortId, PortConfig>,
    #[serde(default, with = "keyed_list")]
    pub vlans: BTreeMap<VlanId, VlanConfig>,
    #[serde(default, with = "keyed_list")]
    pub neighbors: BTreeMap<NeighborKey, NeighborConfig>,
    #[serde(default, with = "keyed_list")]
    pub routes: BTreeMap<RouteKey, RouteConfig>,
}

impl SwitchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_src_mac(mut self, mac: MacAddress) -> Self {
        self.src_mac = mac;
        self
    }

    pub fn with_port(mut self, port: PortConfig) -> Self {
        self.ports.insert(port.id, port);
        self
    }

    pub fn with_vlan(mut self, vlan: VlanConfig) -> Self {
        self.vlans.insert(vlan.id, vlan);
        self
    }

    pub fn with_neighbor(mut self, neighbor: NeighborConfig) -> Self {
        self.neighbors.insert(neighbor.key(), neighbor);
        self
    }

    pub fn with_route(mut self, route: RouteConfig) -> Self {
        self.routes.insert(RouteConfig::key(&route), route);
        self
    }

    pub fn without_route(mut self, key: &RouteKey) -> Self {
        self.routes.remove(key);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, StateError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, StateError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| StateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nhg::NextHop;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_json_document() {
        let json = r#"{
            "src_mac": "02:00:00:00:00:01",
            "ports": [
                { "id": 0, "speed": "100G", "admin_state": "up" },
                { "id": 1, "speed": "25G" }
            ],
            "vlans": [ { "id": 10, "members": { "0": "tagged" } } ],
            "neighbors": [ { "ip": "10.0.0.2", "interface": 1, "mac": "02:00:00:00:00:02" } ],
            "routes": [
                {
                    "prefix": "192.168.0.0/16",
                    "action": { "next_hops": [ { "ip": "10.0.0.2", "interface": 1 } ] }
                },
                { "prefix": "0.0.0.0/0", "action": "drop" }
            ]
        }"#;
        let state = SwitchState::from_json(json).unwrap();

        assert_eq!(state.ports.len(), 2);
        assert!(state.ports[&PortId::new(0)].is_enabled());
        assert!(!state.ports[&PortId::new(1)].is_enabled());
        assert_eq!(
            state.vlans[&VlanId::new(10).unwrap()].members[&PortId::new(0)],
            VlanTagging::Tagged
        );
        let route = RouteKey {
            router: RouterId::DEFAULT,
            prefix: "192.168.0.0/16".parse().unwrap(),
        };
        let expected: NextHopSet =
            [NextHop::new("10.0.0.2".parse().unwrap(), InterfaceId::new(1))].into_iter().collect();
        assert_eq!(state.routes[&route].action, RouteAction::NextHops(expected));
    }

    #[test]
    fn test_json_round_trip() {
        let state = SwitchState::new()
            .with_port(PortConfig::new(PortId::new(4), PortSpeed::FiftyG).enabled())
            .with_neighbor(NeighborConfig::unresolved(
                "fe80::1".parse().unwrap(),
                InterfaceId::new(2),
            ))
            .with_route(RouteConfig::new("10.1.0.0/24".parse().unwrap(), RouteAction::ToCpu));

        let json = state.to_json().unwrap();
        assert_eq!(SwitchState::from_json(&json).unwrap(), state);
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let json = r#"{ "ports": [ { "id": 1, "speed": "10G" }, { "id": 1, "speed": "25G" } ] }"#;
        assert!(SwitchState::from_json(json).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = SwitchState::load("/nonexistent/state.json").unwrap_err();
        assert!(matches!(err, StateError::Io { .. }));
    }
}
