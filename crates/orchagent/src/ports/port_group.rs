//! Four-lane port groups.
//!
//! The four serdes lanes of a group can run as one port (all four lanes on
//! the controlling port), two ports (lanes 0 and 2) or four ports. The lane
//! count is a group-wide register on the controlling port, so changing it
//! means taking the whole group down first.

use super::PortManager;
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::error::{ErrorClass, ManagerError};
use crate::platform::{Platform, PlatformPort};
use crate::state::PortConfig;
use log::{debug, info, warn};
use sonic_types::{PortId, PortSpeed};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub const PORTS_PER_GROUP: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LaneMode {
    Single,
    Dual,
    Quad,
}

impl LaneMode {
    pub const fn active_lanes(&self) -> u32 {
        match self {
            LaneMode::Single => 1,
            LaneMode::Dual => 2,
            LaneMode::Quad => 4,
        }
    }

    pub fn from_active_lanes(lanes: u32) -> Option<Self> {
        match lanes {
            1 => Some(LaneMode::Single),
            2 => Some(LaneMode::Dual),
            4 => Some(LaneMode::Quad),
            _ => None,
        }
    }

    /// Whether a port on `lane` may be up while the group runs in this mode.
    pub const fn allows_lane(&self, lane: usize) -> bool {
        match self {
            LaneMode::Single => lane < PORTS_PER_GROUP,
            LaneMode::Dual => lane == 0 || lane == 2,
            LaneMode::Quad => lane == 0,
        }
    }
}

impl fmt::Display for LaneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneMode::Single => write!(f, "SINGLE"),
            LaneMode::Dual => write!(f, "DUAL"),
            LaneMode::Quad => write!(f, "QUAD"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortGroupError {
    #[error("no supported lane speed can carry {0}")]
    UnsupportedSpeed(PortSpeed),

    #[error("an enabled port in a port group needs an explicit speed")]
    DefaultSpeed,

    #[error("lane {lane} cannot be enabled in {mode} mode")]
    InvalidLane { mode: LaneMode, lane: usize },

    #[error("enabled ports of group {group} mix {first} and {second}")]
    MixedSpeeds {
        group: PortId,
        first: PortSpeed,
        second: PortSpeed,
    },

    #[error("port {port} does not support {speed}")]
    PortSpeedUnsupported { port: PortId, speed: PortSpeed },

    #[error("a port group needs 4 ports, got {0}")]
    WrongPortCount(usize),

    #[error("ports {0:?} are not consecutive lanes")]
    PortsNotInLaneOrder(Vec<PortId>),

    #[error("controlling port {port} reports {lanes} active lanes")]
    UnexpectedActiveLanes { port: PortId, lanes: u32 },

    #[error("port {0} is missing from the port group")]
    MissingPort(PortId),

    #[error("port group {0} has not been loaded from hardware")]
    NotLoaded(PortId),

    #[error(transparent)]
    Control(#[from] ManagerError),
}

impl PortGroupError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PortGroupError::UnsupportedSpeed(_)
            | PortGroupError::DefaultSpeed
            | PortGroupError::InvalidLane { .. }
            | PortGroupError::MixedSpeeds { .. }
            | PortGroupError::PortSpeedUnsupported { .. } => ErrorClass::ConfigInvalid,
            PortGroupError::WrongPortCount(_)
            | PortGroupError::PortsNotInLaneOrder(_)
            | PortGroupError::UnexpectedActiveLanes { .. }
            | PortGroupError::MissingPort(_)
            | PortGroupError::NotLoaded(_) => ErrorClass::Invariant,
            PortGroupError::Control(err) => err.class(),
        }
    }
}

/// Hardware side of a lane reconfiguration.
pub trait LaneControl {
    fn set_link_scan(&mut self, ports: &[PortId], enabled: bool) -> Result<(), PortGroupError>;

    fn set_port_enabled(&mut self, port: PortId, enabled: bool) -> Result<(), PortGroupError>;

    fn set_active_lanes(&mut self, port: PortId, mode: LaneMode) -> Result<(), PortGroupError>;
}

/// Lanes needed to carry `speed`, trying lane speeds in the platform's
/// preference order. The first lane speed that divides `speed` into at most
/// four lanes wins.
pub fn needed_lane_mode_for_speed(
    speed: PortSpeed,
    lane_speeds: &[PortSpeed],
) -> Result<LaneMode, PortGroupError> {
    if speed == PortSpeed::Default {
        return Err(PortGroupError::DefaultSpeed);
    }

    for lane_speed in lane_speeds {
        let lane_mbps = lane_speed.mbps();
        if lane_mbps == 0 || speed.mbps() % lane_mbps != 0 {
            continue;
        }
        match speed.mbps() / lane_mbps {
            1 => return Ok(LaneMode::Single),
            2 => return Ok(LaneMode::Dual),
            3 | 4 => return Ok(LaneMode::Quad),
            _ => continue,
        }
    }
    Err(PortGroupError::UnsupportedSpeed(speed))
}

/// Lane mode for a group given each lane's desired port, indexed by lane.
///
/// Absent and disabled ports place no requirement on the group.
pub fn calculate_desired_lane_mode(
    ports: &[Option<&PortConfig>],
    lane_speeds: &[PortSpeed],
) -> Result<LaneMode, PortGroupError> {
    let enabled: Vec<(usize, &PortConfig)> = ports
        .iter()
        .enumerate()
        .filter_map(|(lane, port)| port.filter(|p| p.is_enabled()).map(|p| (lane, p)))
        .collect();

    if let Some((_, first)) = enabled.first() {
        if let Some((_, other)) = enabled.iter().find(|(_, p)| p.speed != first.speed) {
            return Err(PortGroupError::MixedSpeeds {
                group: first.id,
                first: first.speed,
                second: other.speed,
            });
        }
    }

    let mut mode = LaneMode::Single;
    for (_, port) in &enabled {
        mode = mode.max(needed_lane_mode_for_speed(port.speed, lane_speeds)?);
    }
    if let Some((lane, _)) = enabled.iter().find(|(lane, _)| !mode.allows_lane(*lane)) {
        return Err(PortGroupError::InvalidLane { mode, lane: *lane });
    }
    Ok(mode)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LoadedState {
    lane_mode: LaneMode,
    port_speed: PortSpeed,
}

/// Four ports sharing serdes lanes; lane 0 is the controlling port.
pub struct PortGroup {
    ports: [PortId; PORTS_PER_GROUP],
    platform_ports: Vec<Arc<dyn PlatformPort>>,
    loaded: Option<LoadedState>,
}

impl PortGroup {
    /// Builds a group from four consecutive lanes known to the platform.
    pub fn new(ports: &[PortId], platform: &Platform) -> Result<Self, PortGroupError> {
        let ports: [PortId; PORTS_PER_GROUP] = ports
            .try_into()
            .map_err(|_| PortGroupError::WrongPortCount(ports.len()))?;
        let first = ports[0].as_raw();
        let in_order = ports
            .iter()
            .zip(0u32..)
            .all(|(port, lane)| first.checked_add(lane) == Some(port.as_raw()));
        if !in_order {
            return Err(PortGroupError::PortsNotInLaneOrder(ports.to_vec()));
        }

        let platform_ports = ports
            .iter()
            .map(|port| {
                platform
                    .port(*port)
                    .ok_or(PortGroupError::MissingPort(*port))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ports,
            platform_ports,
            loaded: None,
        })
    }

    pub fn controlling_port(&self) -> PortId {
        self.ports[0]
    }

    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    pub fn contains(&self, port: PortId) -> bool {
        self.ports.contains(&port)
    }

    pub fn lane_mode(&self) -> Option<LaneMode> {
        self.loaded.map(|state| state.lane_mode)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Forgets the loaded lane mode. A port of the group was removed, so the
    /// group is read back from hardware once all its ports exist again.
    pub fn unload(&mut self) {
        if self.loaded.take().is_some() {
            debug!("Port group {} unloaded", self.controlling_port());
        }
    }

    /// Reads the current lane mode and speed from the programmed ports.
    pub fn load(&mut self, port_manager: &PortManager) -> Result<(), PortGroupError> {
        let controlling = self.controlling_port();
        let mut enabled_speed: Option<PortSpeed> = None;
        for port in self.ports {
            let speed = port_manager
                .speed(port)
                .ok_or(PortGroupError::MissingPort(port))?;
            if port_manager.is_enabled(port) != Some(true) {
                continue;
            }
            match enabled_speed {
                None => enabled_speed = Some(speed),
                Some(first) if first != speed => {
                    return Err(PortGroupError::MixedSpeeds {
                        group: controlling,
                        first,
                        second: speed,
                    });
                }
                Some(_) => {}
            }
        }

        let lanes = port_manager
            .active_lanes(controlling)
            .ok_or(PortGroupError::MissingPort(controlling))?;
        let lane_mode = LaneMode::from_active_lanes(lanes).ok_or(
            PortGroupError::UnexpectedActiveLanes {
                port: controlling,
                lanes,
            },
        )?;
        let port_speed = port_manager
            .speed(controlling)
            .ok_or(PortGroupError::MissingPort(controlling))?;

        debug!(
            "Port group {} loaded in {} mode at {}",
            controlling, lane_mode, port_speed
        );
        self.loaded = Some(LoadedState {
            lane_mode,
            port_speed,
        });
        Ok(())
    }

    /// Lane mode the group needs for `ports`, without touching hardware.
    pub fn desired_lane_mode(
        &self,
        ports: &BTreeMap<PortId, PortConfig>,
    ) -> Result<LaneMode, PortGroupError> {
        let configs: Vec<Option<&PortConfig>> =
            self.ports.iter().map(|port| ports.get(port)).collect();

        for (platform_port, config) in self.platform_ports.iter().zip(&configs) {
            if let Some(config) = config {
                if !platform_port.supports_speed(config.speed) {
                    return Err(PortGroupError::PortSpeedUnsupported {
                        port: config.id,
                        speed: config.speed,
                    });
                }
            }
        }

        calculate_desired_lane_mode(&configs, self.platform_ports[0].supported_lane_speeds())
    }

    pub fn valid_configuration(&self, ports: &BTreeMap<PortId, PortConfig>) -> bool {
        match self.desired_lane_mode(ports) {
            Ok(_) => true,
            Err(e) => {
                debug!("Port group {} rejects configuration: {}", self.controlling_port(), e);
                false
            }
        }
    }

    /// Brings the group's lanes in line with `ports`. Returns whether the
    /// lane mode was reprogrammed.
    pub fn reconfigure_if_needed(
        &mut self,
        ports: &BTreeMap<PortId, PortConfig>,
        control: &mut dyn LaneControl,
    ) -> Result<bool, PortGroupError> {
        let controlling = self.controlling_port();
        let loaded = self.loaded.ok_or(PortGroupError::NotLoaded(controlling))?;
        let desired = self.desired_lane_mode(ports)?;

        if let Some(config) = ports.get(&controlling) {
            if config.speed != loaded.port_speed {
                self.platform_ports[0].link_speed_changed(config.speed);
                if let Some(state) = self.loaded.as_mut() {
                    state.port_speed = config.speed;
                }
            }
        }

        if desired == loaded.lane_mode {
            return Ok(false);
        }
        self.reconfigure_lane_mode(ports, loaded.lane_mode, desired, control)?;
        Ok(true)
    }

    fn reconfigure_lane_mode(
        &mut self,
        ports: &BTreeMap<PortId, PortConfig>,
        from: LaneMode,
        to: LaneMode,
        control: &mut dyn LaneControl,
    ) -> Result<(), PortGroupError> {
        let controlling = self.controlling_port();
        info!("Reconfiguring port group {} from {} to {}", controlling, from, to);

        let result = self.run_sequence(ports, to, control);
        match &result {
            Ok(()) => {
                if let Some(state) = self.loaded.as_mut() {
                    state.lane_mode = to;
                }
                audit_log!(AuditRecord::new(
                    AuditCategory::PortReconfiguration,
                    "PortGroup",
                    "reconfigure_lane_mode"
                )
                .with_outcome(AuditOutcome::Success)
                .with_object_id(controlling.to_string())
                .with_object_type("port_group")
                .with_details(serde_json::json!({
                    "from": from.to_string(),
                    "to": to.to_string(),
                })));
            }
            Err(e) => {
                warn!("Port group {} reconfiguration failed: {}", controlling, e);
                audit_log!(AuditRecord::new(
                    AuditCategory::PortReconfiguration,
                    "PortGroup",
                    "reconfigure_lane_mode"
                )
                .with_object_id(controlling.to_string())
                .with_object_type("port_group")
                .with_error(e.to_string()));
            }
        }
        result
    }

    fn run_sequence(
        &self,
        ports: &BTreeMap<PortId, PortConfig>,
        mode: LaneMode,
        control: &mut dyn LaneControl,
    ) -> Result<(), PortGroupError> {
        control.set_link_scan(&self.ports, false)?;
        for (port, platform_port) in self.ports.iter().zip(&self.platform_ports) {
            platform_port.pre_port_disable();
            control.set_port_enabled(*port, false)?;
        }

        control.set_active_lanes(self.controlling_port(), mode)?;

        let to_enable: Vec<(PortId, &Arc<dyn PlatformPort>)> = self
            .ports
            .iter()
            .zip(&self.platform_ports)
            .filter(|(port, _)| ports.get(*port).is_some_and(PortConfig::is_enabled))
            .map(|(port, platform_port)| (*port, platform_port))
            .collect();
        let enabled_ids: Vec<PortId> = to_enable.iter().map(|(port, _)| *port).collect();
        control.set_link_scan(&enabled_ids, true)?;
        for (port, platform_port) in to_enable {
            control.set_port_enabled(port, true)?;
            platform_port.post_port_enable();
        }
        Ok(())
    }
}

impl fmt::Debug for PortGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortGroup")
            .field("ports", &self.ports)
            .field("lane_mode", &self.lane_mode())
            .finish()
    }
}

/// Drives a lane reconfiguration through the [`PortManager`].
///
/// Enabling a port programs its full desired configuration, so speed changes
/// that forced the reconfiguration land together with the admin state.
pub struct PortManagerLaneControl<'a> {
    port_manager: &'a mut PortManager,
    desired: &'a BTreeMap<PortId, PortConfig>,
}

impl<'a> PortManagerLaneControl<'a> {
    pub fn new(
        port_manager: &'a mut PortManager,
        desired: &'a BTreeMap<PortId, PortConfig>,
    ) -> Self {
        Self {
            port_manager,
            desired,
        }
    }
}

impl LaneControl for PortManagerLaneControl<'_> {
    fn set_link_scan(&mut self, ports: &[PortId], enabled: bool) -> Result<(), PortGroupError> {
        for port in ports {
            if self.port_manager.contains(*port) {
                self.port_manager.set_link_scan(*port, enabled)?;
            }
        }
        Ok(())
    }

    fn set_port_enabled(&mut self, port: PortId, enabled: bool) -> Result<(), PortGroupError> {
        if !self.port_manager.contains(port) {
            return Ok(());
        }
        match self.desired.get(&port) {
            Some(config) if enabled => {
                self.port_manager.add_port(config)?;
            }
            _ => {
                self.port_manager.set_admin_state(port, enabled)?;
            }
        }
        Ok(())
    }

    fn set_active_lanes(&mut self, port: PortId, mode: LaneMode) -> Result<(), PortGroupError> {
        self.port_manager.set_active_lanes(port, mode.active_lanes())?;
        Ok(())
    }
}
