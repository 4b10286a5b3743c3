//! Reconciliation driver for one switch.
//!
//! [`HwSwitch`] turns a pair of desired states into hardware calls. Deltas
//! are validated against the platform before anything is written; once
//! writing starts, an adapter failure or a bookkeeping error marks the
//! switch failed and every later call is refused.

use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::error::{ErrorClass, ManagerError};
use crate::manager_table::ManagerTable;
use crate::nhg::NeighborKey;
use crate::platform::Platform;
use crate::ports::{PortGroup, PortGroupError, PortManagerLaneControl};
use crate::state::{DeltaValue, PortConfig, RouteAction, StateDelta, SwitchState};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use sonic_sai::SaiApi;
use sonic_types::{AdminState, MacAddress, PortId};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// How the agent came up relative to the hardware it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootType {
    /// Hardware starts empty; every object is created.
    #[default]
    Cold,
    /// Hardware keeps its programming; objects are reloaded and claimed.
    Warm,
}

impl fmt::Display for BootType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootType::Cold => write!(f, "cold"),
            BootType::Warm => write!(f, "warm"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HwSwitchError {
    /// The delta was rejected before any hardware write.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error(transparent)]
    PortGroup(#[from] PortGroupError),

    #[error("Switch failed: {0}")]
    SwitchFailed(String),
}

impl HwSwitchError {
    pub fn class(&self) -> ErrorClass {
        match self {
            HwSwitchError::ConfigInvalid(_) => ErrorClass::ConfigInvalid,
            HwSwitchError::Manager(e) => e.class(),
            HwSwitchError::PortGroup(e) => e.class(),
            HwSwitchError::SwitchFailed(_) => ErrorClass::Hardware,
        }
    }
}

pub type HwSwitchResult<T> = Result<T, HwSwitchError>;

pub struct HwSwitch {
    managers: ManagerTable,
    platform: Platform,
    port_groups: Vec<PortGroup>,
    boot: BootType,
    warm_boot_pending: bool,
    failed: Option<String>,
}

impl HwSwitch {
    /// Creates (cold) or reloads (warm) every hardware object store.
    ///
    /// `groups` lists the lanes of each port group, controlling port first.
    pub fn init(
        api: Arc<dyn SaiApi>,
        platform: Platform,
        groups: &[Vec<PortId>],
        boot: BootType,
    ) -> HwSwitchResult<Self> {
        info!("Initializing switch ({} boot, {} platform)", boot, platform.kind());
        let managers = ManagerTable::new(api, boot)?;
        let port_groups = groups
            .iter()
            .map(|ports| PortGroup::new(ports, &platform))
            .collect::<Result<Vec<_>, _>>()?;

        audit_log!(AuditRecord::new(AuditCategory::SystemLifecycle, "HwSwitch", "init")
            .with_outcome(AuditOutcome::Success)
            .with_object_type("switch")
            .with_details(serde_json::json!({
                "boot": boot.to_string(),
                "platform": platform.kind().to_string(),
                "port_groups": port_groups.len(),
                "reloaded": format!("{:?}", managers.reloaded()),
            })));

        Ok(Self {
            managers,
            platform,
            port_groups,
            boot,
            warm_boot_pending: boot == BootType::Warm,
            failed: None,
        })
    }

    pub fn boot_type(&self) -> BootType {
        self.boot
    }

    pub fn managers(&self) -> &ManagerTable {
        &self.managers
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn port_groups(&self) -> &[PortGroup] {
        &self.port_groups
    }

    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }

    /// Programs the difference between `old` and `new` and returns the
    /// state now in hardware.
    pub fn apply_delta(
        &mut self,
        old: &SwitchState,
        new: &SwitchState,
    ) -> HwSwitchResult<SwitchState> {
        let _span = tracing::info_span!(
            "apply_delta",
            ports = new.ports.len(),
            vlans = new.vlans.len(),
            routes = new.routes.len()
        )
        .entered();
        self.ensure_running()?;

        let delta = StateDelta::new(old, new);
        if delta.is_empty() {
            debug!("Empty delta, nothing to program");
            return Ok(new.clone());
        }
        self.validate(new)?;

        let result = self.apply(&delta, new);
        self.settle(result)?;
        Ok(new.clone())
    }

    /// Neighbor resolution learned outside of desired state.
    pub fn neighbor_resolved(&mut self, key: NeighborKey, mac: MacAddress) -> HwSwitchResult<()> {
        self.ensure_running()?;
        let result = self
            .managers
            .resolve_neighbor(key, mac)
            .map_err(HwSwitchError::from);
        self.settle(result)
    }

    pub fn neighbor_unresolved(&mut self, key: &NeighborKey) -> HwSwitchResult<()> {
        self.ensure_running()?;
        let result = self
            .managers
            .unresolve_neighbor(key)
            .map_err(HwSwitchError::from);
        self.settle(result)
    }

    /// Removes objects reloaded at warm boot that the first reconciliation
    /// did not claim. Returns how many were removed.
    pub fn finish_warm_boot(&mut self) -> HwSwitchResult<usize> {
        self.ensure_running()?;
        if !self.warm_boot_pending {
            return Ok(0);
        }
        let result = self.managers.remove_unclaimed().map_err(HwSwitchError::from);
        let removed = self.settle(result)?;
        self.warm_boot_pending = false;

        info!("Warm boot complete, {} stale objects removed", removed);
        audit_log!(AuditRecord::new(AuditCategory::WarmRestart, "HwSwitch", "finish_warm_boot")
            .with_outcome(AuditOutcome::Success)
            .with_object_type("switch")
            .with_details(serde_json::json!({ "removed": removed })));
        Ok(removed)
    }

    fn ensure_running(&self) -> HwSwitchResult<()> {
        match &self.failed {
            Some(reason) => Err(HwSwitchError::SwitchFailed(reason.clone())),
            None => Ok(()),
        }
    }

    fn settle<T>(&mut self, result: HwSwitchResult<T>) -> HwSwitchResult<T> {
        if let Err(e) = &result {
            if e.class().is_fatal() {
                error!("Switch failed ({}): {}", e.class(), e);
                audit_log!(AuditRecord::new(
                    AuditCategory::ErrorCondition,
                    "HwSwitch",
                    "switch_failed"
                )
                    .with_object_type("switch")
                    .with_error(e.to_string())
                    .with_details(serde_json::json!({ "class": e.class().to_string() })));
                self.failed = Some(e.to_string());
            } else {
                warn!("Delta rejected: {}", e);
            }
        }
        result
    }

    /// Checks `new` against the platform and hardware limits without
    /// writing anything.
    fn validate(&mut self, new: &SwitchState) -> HwSwitchResult<()> {
        for config in new.ports.values() {
            let platform_port = self.platform.port(config.id).ok_or_else(|| {
                HwSwitchError::ConfigInvalid(format!("{} is not a platform port", config.id))
            })?;
            if !platform_port.supports_speed(config.speed) {
                return Err(HwSwitchError::ConfigInvalid(format!(
                    "{} does not support {}",
                    config.id, config.speed
                )));
            }
        }

        for group in &self.port_groups {
            if !group.valid_configuration(&new.ports) {
                return Err(HwSwitchError::ConfigInvalid(format!(
                    "port group {} cannot carry the requested speeds",
                    group.controlling_port()
                )));
            }
        }

        for vlan in new.vlans.values() {
            if let Some(port) = vlan.members.keys().find(|port| !new.ports.contains_key(*port)) {
                return Err(HwSwitchError::ConfigInvalid(format!(
                    "{} member {} is not a configured port",
                    vlan.id, port
                )));
            }
        }

        let routers: BTreeSet<_> = new.routes.keys().map(|key| key.router).collect();
        for router in routers {
            self.managers.add_virtual_router(router)?;
        }
        if let Some(route) = new
            .routes
            .values()
            .find(|route| matches!(&route.action, RouteAction::NextHops(set) if set.is_empty()))
        {
            return Err(HwSwitchError::ConfigInvalid(format!(
                "route {} has an empty next hop set",
                route.key()
            )));
        }
        Ok(())
    }

    fn apply(&mut self, delta: &StateDelta<'_>, new: &SwitchState) -> HwSwitchResult<()> {
        if let Some(mac) = delta.src_mac() {
            self.managers.set_src_mac(mac)?;
        }

        // New ports of a port group come up only after the group's lanes are
        // set. Ports reloaded at warm boot keep their hardware state.
        let ports = delta.ports();
        for (id, change) in &ports {
            if let DeltaValue::Added(config) = change {
                if self.in_port_group(**id) && !self.managers.ports().contains(**id) {
                    let held = PortConfig {
                        admin_state: AdminState::Down,
                        ..(*config).clone()
                    };
                    self.managers.ports_mut().add_port(&held)?;
                } else {
                    self.managers.ports_mut().add_port(config)?;
                }
            }
        }
        self.reconfigure_port_groups(new)?;
        for (id, change) in &ports {
            match change {
                DeltaValue::Added(config) if self.in_port_group(**id) => {
                    self.managers.ports_mut().add_port(config)?;
                }
                DeltaValue::Changed { old, new } => {
                    self.managers.ports_mut().change_port(old, new)?;
                }
                _ => {}
            }
        }

        let (vlan_removals, vlan_updates): (Vec<_>, Vec<_>) =
            delta.vlans().into_iter().partition(|(_, change)| change.is_removed());
        self.managers.process_vlan_delta(&vlan_updates)?;

        for (key, change) in delta.neighbors() {
            match change.after() {
                Some(config) => self.managers.set_neighbor(config)?,
                None => self.managers.remove_neighbor(key)?,
            }
        }

        for (key, change) in delta.routes() {
            let router = self
                .managers
                .virtual_routers()
                .get_virtual_router(key.router)
                .ok_or_else(|| ManagerError::not_found("virtual router", key.router))?;
            match change.after() {
                Some(config) => self.managers.add_route(router, config)?,
                None => self.managers.remove_route(router, key.prefix)?,
            }
        }

        self.managers.process_vlan_delta(&vlan_removals)?;
        for (id, change) in &ports {
            if change.is_removed() {
                self.managers.ports_mut().remove_port(**id)?;
                for group in self.port_groups.iter_mut().filter(|group| group.contains(**id)) {
                    group.unload();
                }
            }
        }
        Ok(())
    }

    fn in_port_group(&self, port: PortId) -> bool {
        self.port_groups.iter().any(|group| group.contains(port))
    }

    /// Loads groups whose ports are all programmed, then brings each
    /// group's lane mode in line with `new`.
    fn reconfigure_port_groups(&mut self, new: &SwitchState) -> HwSwitchResult<()> {
        for group in &mut self.port_groups {
            let port_manager = self.managers.ports_mut();
            if !group.is_loaded() {
                if !group.ports().iter().all(|port| port_manager.contains(*port)) {
                    debug!(
                        "Port group {} not fully programmed, lanes left alone",
                        group.controlling_port()
                    );
                    continue;
                }
                group.load(port_manager)?;
            }
            let mut control = PortManagerLaneControl::new(port_manager, &new.ports);
            group.reconfigure_if_needed(&new.ports, &mut control)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HwSwitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HwSwitch")
            .field("boot", &self.boot)
            .field("platform", &self.platform)
            .field("port_groups", &self.port_groups)
            .field("failed", &self.failed)
            .finish()
    }
}
