//! Integration tests for the reconciliation core against the fake adapter.
//!
//! Each test drives a complete [`HwSwitch`] (or the daemon around it) and
//! asserts on the adapter call log, the platform notifications, or the
//! manager lookups a management layer would use.

use pretty_assertions::assert_eq;
use sonic_orchagent::config::AgentConfig;
use sonic_orchagent::daemon::{OrchDaemon, OrchDaemonConfig};
use sonic_orchagent::nhg::{NeighborKey, NextHop, NextHopSet};
use sonic_orchagent::platform::{Platform, PlatformEvent, PlatformKind};
use sonic_orchagent::ports::LaneMode;
use sonic_orchagent::state::{
    NeighborConfig, PortConfig, RouteAction, RouteConfig, SwitchState, VlanConfig, VlanTagging,
};
use sonic_orchagent::{BootType, ErrorClass, HwSwitch, HwSwitchError};
use sonic_sai::schema::{next_hop_group_member, port};
use sonic_sai::{
    AdapterKey, AttrId, AttrValue, FakeSai, ObjectType, SaiCall, SaiStatus, NULL_OBJECT_ID,
};
use sonic_types::{InterfaceId, IpAddress, MacAddress, PortId, PortSpeed, RouterId, VlanId};
use std::sync::Arc;
use tempfile::TempDir;

// ============================================================================
// Fixtures
// ============================================================================

fn platform() -> Platform {
    let mut platform = Platform::new(PlatformKind::Fake);
    for id in 0..8 {
        platform.add_port(PortId::new(id), None);
    }
    platform
}

fn groups() -> Vec<Vec<PortId>> {
    vec![
        (0..4).map(PortId::new).collect(),
        (4..8).map(PortId::new).collect(),
    ]
}

fn init(fake: &Arc<FakeSai>, boot: BootType) -> HwSwitch {
    HwSwitch::init(fake.clone(), platform(), &groups(), boot).unwrap()
}

fn ip(addr: &str) -> IpAddress {
    addr.parse().unwrap()
}

fn mac(last: u8) -> MacAddress {
    MacAddress::new([0x02, 0, 0, 0, 0, last])
}

fn neighbor(last: u8) -> NeighborConfig {
    NeighborConfig::resolved(ip(&format!("10.0.0.{}", last)), InterfaceId::new(1), mac(last))
}

fn next_hops(lasts: &[u8]) -> NextHopSet {
    let mut set = NextHopSet::new();
    for last in lasts {
        set.insert(NextHop::new(
            ip(&format!("10.0.0.{}", last)),
            InterfaceId::new(1),
        ));
    }
    set
}

fn route(prefix: &str, lasts: &[u8]) -> RouteConfig {
    RouteConfig::new(prefix.parse().unwrap(), RouteAction::NextHops(next_hops(lasts)))
}

/// Eight ports, every port enabled at `speed`.
fn all_ports(speed: PortSpeed) -> SwitchState {
    (0..8).fold(SwitchState::new(), |state, id| {
        state.with_port(PortConfig::new(PortId::new(id), speed).enabled())
    })
}

/// Group 0 with only lane 0 enabled at `speed`, lanes 1-3 disabled at 25G.
fn lane_zero_only(speed: PortSpeed) -> SwitchState {
    (1..4).fold(
        SwitchState::new().with_port(PortConfig::new(PortId::new(0), speed).enabled()),
        |state, id| state.with_port(PortConfig::new(PortId::new(id), PortSpeed::TwentyFiveG)),
    )
}

/// Ports, a VLAN, three neighbors and routes sharing next-hop groups.
fn full_state() -> SwitchState {
    let vlan = VlanConfig::new(VlanId::new(100).unwrap())
        .with_member(PortId::new(4), VlanTagging::Untagged)
        .with_member(PortId::new(5), VlanTagging::Tagged);
    all_ports(PortSpeed::TwentyFiveG)
        .with_src_mac(mac(0xaa))
        .with_vlan(vlan)
        .with_neighbor(neighbor(1))
        .with_neighbor(neighbor(2))
        .with_neighbor(neighbor(3))
        .with_route(route("192.168.1.0/24", &[1, 2]))
        .with_route(route("192.168.2.0/24", &[1, 3]))
        .with_route(route("192.168.3.0/24", &[2, 3]))
        .with_route(route("192.168.4.0/24", &[1, 2]))
        .with_route(RouteConfig::new(
            "0.0.0.0/0".parse().unwrap(),
            RouteAction::ToCpu,
        ))
}

fn port_key(hw: &HwSwitch, id: u32) -> AdapterKey {
    hw.managers()
        .ports()
        .port_oid(PortId::new(id))
        .unwrap()
        .adapter_key()
}

fn set(key: &AdapterKey, id: AttrId, value: AttrValue) -> SaiCall {
    SaiCall::SetAttribute {
        key: *key,
        id,
        value,
    }
}

// ============================================================================
// 1. End-to-end programming
// ============================================================================

#[test]
fn test_cold_boot_programs_full_state() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    let state = full_state();

    let programmed = hw.apply_delta(&SwitchState::default(), &state).unwrap();
    assert_eq!(programmed, state);

    assert_eq!(fake.count(ObjectType::Port), 8);
    assert_eq!(fake.count(ObjectType::Vlan), 1);
    assert_eq!(fake.count(ObjectType::VlanMember), 2);
    assert_eq!(fake.count(ObjectType::NextHop), 3);
    // {1,2} is shared by two routes.
    assert_eq!(fake.count(ObjectType::NextHopGroup), 3);
    assert_eq!(fake.count(ObjectType::NextHopGroupMember), 6);
    assert_eq!(fake.count(ObjectType::Route), 5);

    let managers = hw.managers();
    assert_eq!(managers.switch().src_mac(), mac(0xaa));
    assert_eq!(managers.next_hop_groups().ref_count(&next_hops(&[1, 2])), 2);
    assert_eq!(managers.next_hop_groups().ref_count(&next_hops(&[2, 3])), 1);
    assert_eq!(
        managers.vlans().vlan_ids_by_port(PortId::new(5)),
        vec![VlanId::new(100).unwrap()]
    );
    for group in hw.port_groups() {
        assert_eq!(group.lane_mode(), Some(LaneMode::Single));
    }
}

#[test]
fn test_reapplying_state_is_silent() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    let state = full_state();
    hw.apply_delta(&SwitchState::default(), &state).unwrap();
    fake.clear_calls();

    hw.apply_delta(&state, &state.clone()).unwrap();
    assert!(fake.calls().is_empty());
}

#[test]
fn test_route_moves_between_groups() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    let before = full_state();
    hw.apply_delta(&SwitchState::default(), &before).unwrap();

    // The only route on {2,3} moves to {1,2}; {2,3} loses its last reference.
    let after = before.clone().with_route(route("192.168.3.0/24", &[1, 2]));
    hw.apply_delta(&before, &after).unwrap();

    let nhg = hw.managers().next_hop_groups();
    assert_eq!(nhg.ref_count(&next_hops(&[1, 2])), 3);
    assert!(nhg.get_next_hop_group_handle(&next_hops(&[2, 3])).is_none());
    assert_eq!(fake.count(ObjectType::NextHopGroup), 2);
    assert_eq!(fake.count(ObjectType::NextHopGroupMember), 4);

    // Removing everything tears the groups down with the routes.
    hw.apply_delta(&after, &SwitchState::default()).unwrap();
    for object_type in [
        ObjectType::Route,
        ObjectType::NextHopGroup,
        ObjectType::NextHopGroupMember,
        ObjectType::NextHop,
        ObjectType::VlanMember,
        ObjectType::Vlan,
        ObjectType::Port,
    ] {
        assert_eq!(fake.count(object_type), 0, "{} left behind", object_type);
    }
    assert_eq!(fake.count(ObjectType::VirtualRouter), 1);
}

// ============================================================================
// 2. Warm boot
// ============================================================================

#[test]
fn test_warm_boot_reclaims_without_writes() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("adapter.json");
    let state = full_state();
    {
        let fake = Arc::new(FakeSai::new());
        let mut hw = init(&fake, BootType::Cold);
        hw.apply_delta(&SwitchState::default(), &state).unwrap();
        fake.save(&snapshot).unwrap();
    }

    let fake = Arc::new(FakeSai::load(&snapshot).unwrap());
    let mut hw = init(&fake, BootType::Warm);
    let reloaded = hw.managers().reloaded();
    assert_eq!(reloaded.ports, 8);
    assert_eq!(reloaded.next_hop_groups, 3);
    assert_eq!(reloaded.routes, 5);

    hw.apply_delta(&SwitchState::default(), &state).unwrap();
    assert!(fake.calls().is_empty(), "unexpected writes: {:?}", fake.calls());
    assert_eq!(hw.finish_warm_boot().unwrap(), 0);
    assert!(fake.calls().is_empty());

    // Tracking is fully rebuilt: group references work as after a cold boot.
    assert_eq!(
        hw.managers().next_hop_groups().ref_count(&next_hops(&[1, 2])),
        2
    );
    assert_eq!(
        hw.port_groups()[0].lane_mode(),
        Some(LaneMode::Single)
    );
}

#[test]
fn test_warm_boot_removes_unclaimed_objects() {
    let fake = Arc::new(FakeSai::new());
    let before = full_state();
    init(&fake, BootType::Cold)
        .apply_delta(&SwitchState::default(), &before)
        .unwrap();
    fake.clear_calls();

    // After the restart the route on {2,3} and the VLAN are gone.
    let stale = route("192.168.3.0/24", &[2, 3]).key();
    let mut after = before.clone().without_route(&stale);
    after.vlans.clear();

    let mut hw = init(&fake, BootType::Warm);
    hw.apply_delta(&SwitchState::default(), &after).unwrap();
    assert!(fake.calls().is_empty());

    // route + group + 2 members + VLAN + 2 VLAN members
    assert_eq!(hw.finish_warm_boot().unwrap(), 7);
    assert_eq!(fake.count(ObjectType::Route), 4);
    assert_eq!(fake.count(ObjectType::NextHopGroup), 2);
    assert_eq!(fake.count(ObjectType::Vlan), 0);
    assert!(fake.calls().iter().all(|call| matches!(call, SaiCall::Remove { .. })));

    // A second call has nothing left to do.
    assert_eq!(hw.finish_warm_boot().unwrap(), 0);
}

// ============================================================================
// 3. Port groups
// ============================================================================

#[test]
fn test_single_to_quad_sequence() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    let single = (0..4).fold(SwitchState::new(), |state, id| {
        state.with_port(PortConfig::new(PortId::new(id), PortSpeed::TwentyFiveG).enabled())
    });
    hw.apply_delta(&SwitchState::default(), &single).unwrap();
    assert_eq!(hw.port_groups()[0].lane_mode(), Some(LaneMode::Single));
    fake.clear_calls();

    let quad = lane_zero_only(PortSpeed::HundredG);
    hw.apply_delta(&single, &quad).unwrap();
    assert_eq!(hw.port_groups()[0].lane_mode(), Some(LaneMode::Quad));

    let p: Vec<AdapterKey> = (0..4).map(|id| port_key(&hw, id)).collect();
    let mut expected: Vec<SaiCall> = p
        .iter()
        .map(|key| set(key, port::LINK_SCAN_ENABLE, AttrValue::Bool(false)))
        .collect();
    expected.extend(
        p.iter()
            .map(|key| set(key, port::ADMIN_STATE, AttrValue::Bool(false))),
    );
    expected.extend([
        set(&p[0], port::ACTIVE_LANES, AttrValue::U32(4)),
        set(&p[0], port::LINK_SCAN_ENABLE, AttrValue::Bool(true)),
        set(&p[0], port::SPEED, AttrValue::U32(PortSpeed::HundredG.mbps())),
        set(&p[0], port::ADMIN_STATE, AttrValue::Bool(true)),
    ]);
    assert_eq!(fake.calls(), expected);

    let port0 = PortId::new(0);
    assert_eq!(
        hw.platform().events(),
        vec![
            PlatformEvent::SpeedChanged {
                port: port0,
                speed: PortSpeed::HundredG
            },
            PlatformEvent::PreDisable(PortId::new(0)),
            PlatformEvent::PreDisable(PortId::new(1)),
            PlatformEvent::PreDisable(PortId::new(2)),
            PlatformEvent::PreDisable(PortId::new(3)),
            PlatformEvent::PostEnable(port0),
        ]
    );
}

#[test]
fn test_cold_boot_enables_ports_after_lane_mode() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    fake.clear_calls();

    let quad = lane_zero_only(PortSpeed::HundredG);
    hw.apply_delta(&SwitchState::default(), &quad).unwrap();
    assert_eq!(hw.port_groups()[0].lane_mode(), Some(LaneMode::Quad));

    let calls = fake.calls();
    let (creates, sets): (Vec<SaiCall>, Vec<SaiCall>) =
        calls.into_iter().partition(SaiCall::is_create);
    assert_eq!(creates.len(), 4);
    for create in &creates {
        if let SaiCall::Create { attrs, .. } = create {
            assert_eq!(
                attrs.get(port::ADMIN_STATE),
                Some(&AttrValue::Bool(false)),
                "{:?} created enabled",
                create.key()
            );
        }
    }

    let p: Vec<AdapterKey> = (0..4).map(|id| port_key(&hw, id)).collect();
    let mut expected: Vec<SaiCall> = p
        .iter()
        .map(|key| set(key, port::LINK_SCAN_ENABLE, AttrValue::Bool(false)))
        .collect();
    expected.extend([
        set(&p[0], port::ACTIVE_LANES, AttrValue::U32(4)),
        set(&p[0], port::LINK_SCAN_ENABLE, AttrValue::Bool(true)),
        set(&p[0], port::ADMIN_STATE, AttrValue::Bool(true)),
    ]);
    assert_eq!(sets, expected);
    assert_eq!(hw.managers().ports().is_enabled(PortId::new(0)), Some(true));
    assert_eq!(hw.managers().ports().is_enabled(PortId::new(1)), Some(false));
}

#[test]
fn test_recreated_port_reloads_group() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    let port = |id: u32| PortConfig::new(PortId::new(id), PortSpeed::FiftyG);
    let dual = SwitchState::new()
        .with_port(port(0).enabled())
        .with_port(port(1))
        .with_port(port(2).enabled())
        .with_port(port(3));
    hw.apply_delta(&SwitchState::default(), &dual).unwrap();
    assert_eq!(hw.port_groups()[0].lane_mode(), Some(LaneMode::Dual));

    let mut without = dual.clone();
    without.ports.remove(&PortId::new(0));
    hw.apply_delta(&dual, &without).unwrap();
    assert!(!hw.managers().ports().contains(PortId::new(0)));
    assert_eq!(hw.port_groups()[0].lane_mode(), None);

    // The new port 0 starts on one lane and must be brought back to two.
    hw.apply_delta(&without, &dual).unwrap();
    assert_eq!(hw.port_groups()[0].lane_mode(), Some(LaneMode::Dual));
    let ports = hw.managers().ports();
    assert_eq!(ports.active_lanes(PortId::new(0)), Some(2));
    assert_eq!(ports.is_enabled(PortId::new(0)), Some(true));
    assert_eq!(ports.is_enabled(PortId::new(2)), Some(true));
}

#[test]
fn test_speed_change_within_lane_mode_only_notifies() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    let hundred = lane_zero_only(PortSpeed::HundredG);
    hw.apply_delta(&SwitchState::default(), &hundred).unwrap();
    assert_eq!(hw.port_groups()[0].lane_mode(), Some(LaneMode::Quad));
    let seen = hw.platform().events().len();
    fake.clear_calls();

    // 40G still needs four 10G lanes.
    let forty = lane_zero_only(PortSpeed::FortyG);
    hw.apply_delta(&hundred, &forty).unwrap();

    assert_eq!(
        fake.calls(),
        vec![set(
            &port_key(&hw, 0),
            port::SPEED,
            AttrValue::U32(PortSpeed::FortyG.mbps())
        )]
    );
    assert_eq!(
        hw.platform().events()[seen..],
        [PlatformEvent::SpeedChanged {
            port: PortId::new(0),
            speed: PortSpeed::FortyG
        }]
    );
    assert_eq!(hw.port_groups()[0].lane_mode(), Some(LaneMode::Quad));
}

#[test]
fn test_invalid_group_configuration_leaves_hardware_alone() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    let good = all_ports(PortSpeed::Xg);
    hw.apply_delta(&SwitchState::default(), &good).unwrap();
    fake.clear_calls();

    // Lanes 0 and 1 enabled at a speed that needs two lanes each.
    let bad = good
        .clone()
        .with_port(PortConfig::new(PortId::new(0), PortSpeed::FiftyG).enabled())
        .with_port(PortConfig::new(PortId::new(1), PortSpeed::FiftyG).enabled())
        .with_port(PortConfig::new(PortId::new(2), PortSpeed::FiftyG))
        .with_port(PortConfig::new(PortId::new(3), PortSpeed::FiftyG));

    let err = hw.apply_delta(&good, &bad).unwrap_err();
    assert!(matches!(err, HwSwitchError::ConfigInvalid(_)));
    assert_eq!(err.class(), ErrorClass::ConfigInvalid);
    assert!(fake.calls().is_empty());

    // The switch keeps accepting deltas from the last good state.
    let dual = good
        .clone()
        .with_port(PortConfig::new(PortId::new(0), PortSpeed::FiftyG).enabled())
        .with_port(PortConfig::new(PortId::new(1), PortSpeed::FiftyG))
        .with_port(PortConfig::new(PortId::new(2), PortSpeed::FiftyG).enabled())
        .with_port(PortConfig::new(PortId::new(3), PortSpeed::FiftyG));
    hw.apply_delta(&good, &dual).unwrap();
    assert_eq!(hw.port_groups()[0].lane_mode(), Some(LaneMode::Dual));
    assert_eq!(hw.port_groups()[1].lane_mode(), Some(LaneMode::Single));
}

// ============================================================================
// 4. Neighbor resolution
// ============================================================================

#[test]
fn test_unresolved_neighbor_updates_only_dependent_groups() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    hw.apply_delta(&SwitchState::default(), &full_state())
        .unwrap();
    fake.clear_calls();

    let key = NeighborKey::new(ip("10.0.0.3"), InterfaceId::new(1));
    let nhg = hw.managers().next_hop_groups();
    let mut dependents: Vec<NextHopSet> =
        nhg.groups_depending_on(&key).into_iter().cloned().collect();
    dependents.sort();
    assert_eq!(dependents, vec![next_hops(&[1, 3]), next_hops(&[2, 3])]);
    let hop = NextHop::new(ip("10.0.0.3"), InterfaceId::new(1));
    let members: Vec<AdapterKey> = dependents
        .iter()
        .map(|set| {
            nhg.get_next_hop_group_handle(set)
                .and_then(|handle| handle.member(&hop))
                .unwrap()
                .adapter_key()
        })
        .collect();
    let next_hop = hw.managers().neighbors().next_hop(&key).unwrap();

    hw.neighbor_unresolved(&key).unwrap();
    assert_eq!(
        fake.calls(),
        vec![
            set(&members[0], next_hop_group_member::NEXT_HOP_ID, AttrValue::Oid(NULL_OBJECT_ID)),
            set(&members[1], next_hop_group_member::NEXT_HOP_ID, AttrValue::Oid(NULL_OBJECT_ID)),
            SaiCall::Remove {
                key: next_hop.adapter_key()
            },
        ]
    );
    assert!(!hw.managers().neighbors().is_resolved(&key));
    fake.clear_calls();

    hw.neighbor_resolved(key, mac(3)).unwrap();
    let next_hop = hw.managers().neighbors().next_hop(&key).unwrap();
    let calls = fake.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].is_create());
    assert_eq!(
        calls[1..],
        [
            set(&members[0], next_hop_group_member::NEXT_HOP_ID, AttrValue::Oid(next_hop.as_raw())),
            set(&members[1], next_hop_group_member::NEXT_HOP_ID, AttrValue::Oid(next_hop.as_raw())),
        ]
    );
    // Groups were never recreated.
    assert_eq!(fake.count(ObjectType::NextHopGroup), 3);
}

#[test]
fn test_unresolved_neighbor_in_desired_state() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    let state = SwitchState::new()
        .with_neighbor(NeighborConfig::unresolved(ip("10.0.0.9"), InterfaceId::new(1)))
        .with_route(route("172.16.0.0/12", &[9]));
    hw.apply_delta(&SwitchState::default(), &state).unwrap();

    assert_eq!(fake.count(ObjectType::NextHop), 0);
    let handle = hw
        .managers()
        .next_hop_groups()
        .get_next_hop_group_handle(&next_hops(&[9]))
        .unwrap();
    let member = handle.members().values().next().copied().unwrap();
    assert_eq!(
        fake.attributes(&member.adapter_key())
            .and_then(|attrs| attrs.get(next_hop_group_member::NEXT_HOP_ID).cloned()),
        Some(AttrValue::Oid(NULL_OBJECT_ID))
    );
}

// ============================================================================
// 5. Failures
// ============================================================================

#[test]
fn test_second_virtual_router_rejected() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    fake.clear_calls();
    let state = SwitchState::new().with_route(RouteConfig {
        router: RouterId::new(7),
        prefix: "10.1.0.0/16".parse().unwrap(),
        action: RouteAction::Drop,
    });

    let err = hw.apply_delta(&SwitchState::default(), &state).unwrap_err();
    assert_eq!(err.class(), ErrorClass::ConfigInvalid);
    assert!(fake.calls().is_empty());
    assert!(!hw.is_failed());
}

#[test]
fn test_adapter_failure_is_fatal() {
    let fake = Arc::new(FakeSai::new());
    let mut hw = init(&fake, BootType::Cold);
    fake.fail_next_call(ObjectType::NextHopGroup, SaiStatus::InsufficientResources);

    let err = hw
        .apply_delta(&SwitchState::default(), &full_state())
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Hardware);
    assert!(hw.is_failed());

    let key = NeighborKey::new(ip("10.0.0.1"), InterfaceId::new(1));
    assert!(matches!(
        hw.neighbor_unresolved(&key),
        Err(HwSwitchError::SwitchFailed(_))
    ));
    assert!(matches!(
        hw.finish_warm_boot(),
        Err(HwSwitchError::SwitchFailed(_))
    ));
}

// ============================================================================
// 6. Daemon with configuration files
// ============================================================================

#[tokio::test]
async fn test_daemon_applies_files_in_order() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("orchagent.toml");
    std::fs::write(
        &config_path,
        r#"
        [switch]
        platform = "fake"
        src_mac = "02:00:00:00:00:42"

        [daemon]
        queue_depth = 4

        [[port_group]]
        ports = [0, 1, 2, 3]
        "#,
    )
    .unwrap();
    let first = dir.path().join("first.json");
    std::fs::write(
        &first,
        r#"{
            "ports": [
                { "id": 0, "speed": "25G", "admin_state": "up" },
                { "id": 1, "speed": "25G", "admin_state": "up" },
                { "id": 2, "speed": "25G" },
                { "id": 3, "speed": "25G" }
            ],
            "neighbors": [ { "ip": "10.0.0.1", "interface": 1, "mac": "02:00:00:00:00:01" } ],
            "routes": [
                {
                    "prefix": "10.10.0.0/16",
                    "action": { "next_hops": [ { "ip": "10.0.0.1", "interface": 1 } ] }
                }
            ]
        }"#,
    )
    .unwrap();
    let second = dir.path().join("second.json");
    std::fs::write(
        &second,
        r#"{
            "ports": [
                { "id": 0, "speed": "100G", "admin_state": "up" },
                { "id": 1, "speed": "25G" },
                { "id": 2, "speed": "25G" },
                { "id": 3, "speed": "25G" }
            ],
            "routes": [ { "prefix": "10.10.0.0/16", "action": "drop" } ]
        }"#,
    )
    .unwrap();

    let config = AgentConfig::load_or_default(&config_path).unwrap();
    config.validate().unwrap();
    let fake = Arc::new(FakeSai::new());
    let switch = HwSwitch::init(
        fake.clone(),
        config.platform(),
        &config.groups(),
        BootType::Cold,
    )
    .unwrap();
    let (mut daemon, handle) = OrchDaemon::new(config.daemon_config(false), switch);
    let task = tokio::spawn(async move {
        daemon.run().await;
        daemon
    });

    for path in [&first, &second] {
        let mut state = SwitchState::load(path).unwrap();
        if let Some(mac) = config.switch.src_mac {
            state.src_mac = mac;
        }
        handle.apply_state(state).await.unwrap();
    }
    handle.stop().await.unwrap();
    let daemon = task.await.unwrap();

    let hw = daemon.switch();
    assert_eq!(hw.port_groups()[0].lane_mode(), Some(LaneMode::Quad));
    assert_eq!(hw.managers().switch().src_mac(), mac(0x42));
    assert_eq!(fake.count(ObjectType::NextHop), 0);
    assert_eq!(fake.count(ObjectType::NextHopGroup), 0);
    assert_eq!(fake.count(ObjectType::Route), 1);
    assert_eq!(daemon.stats().applied, 2);
    assert_eq!(
        daemon.programmed_state().routes.values().next().map(|r| &r.action),
        Some(&RouteAction::Drop)
    );
}

#[tokio::test]
async fn test_daemon_default_config_matches_agent_default() {
    let config = AgentConfig::default();
    let daemon_config = config.daemon_config(true);
    assert_eq!(daemon_config.queue_depth, OrchDaemonConfig::default().queue_depth);
    assert!(daemon_config.warm_boot);
}
