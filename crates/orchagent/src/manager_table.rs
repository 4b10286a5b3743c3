//! The table of resource managers for one switch.
//!
//! Managers that depend on each other (routes on next-hop groups, next-hop
//! groups on neighbors, VLAN members on ports) are wired together here, so
//! no manager holds a reference to another.

use crate::error::ManagerResult;
use crate::hw_switch::BootType;
use crate::neigh::NeighborManager;
use crate::nhg::{NeighborKey, NextHopGroupManager};
use crate::ports::PortManager;
use crate::route::RouteManager;
use crate::state::{DeltaValue, NeighborConfig, RouteConfig, VlanConfig};
use crate::switch::SwitchManager;
use crate::vlan::VlanManager;
use crate::vrf::VirtualRouterManager;
use log::info;
use sonic_sai::{SaiApi, SwitchOid, VirtualRouterOid};
use sonic_types::{IpPrefix, MacAddress, RouterId, VlanId};
use std::sync::Arc;

/// Object counts reloaded from the adapter during a warm boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadSummary {
    pub ports: usize,
    pub vlans: usize,
    pub next_hops: usize,
    pub next_hop_groups: usize,
    pub routes: usize,
}

pub struct ManagerTable {
    api: Arc<dyn SaiApi>,
    switch: SwitchManager,
    virtual_routers: VirtualRouterManager,
    ports: PortManager,
    vlans: VlanManager,
    neighbors: NeighborManager,
    next_hop_groups: NextHopGroupManager,
    routes: RouteManager,
    reloaded: ReloadSummary,
}

impl ManagerTable {
    /// Builds every manager. A warm boot reloads each store before the
    /// switch and default router are claimed.
    pub fn new(api: Arc<dyn SaiApi>, boot: BootType) -> ManagerResult<Self> {
        let mut switch = SwitchManager::new(Arc::clone(&api));
        if boot == BootType::Warm {
            switch.reload()?;
        }
        let switch_id = switch.init_switch()?.as_raw();

        let mut table = Self {
            virtual_routers: VirtualRouterManager::new(Arc::clone(&api), switch_id),
            ports: PortManager::new(Arc::clone(&api), switch_id),
            vlans: VlanManager::new(Arc::clone(&api), switch_id),
            neighbors: NeighborManager::new(Arc::clone(&api), switch_id),
            next_hop_groups: NextHopGroupManager::new(Arc::clone(&api), switch_id),
            routes: RouteManager::new(Arc::clone(&api), switch_id),
            switch,
            api,
            reloaded: ReloadSummary::default(),
        };

        if boot == BootType::Warm {
            table.virtual_routers.reload()?;
            table.reloaded = ReloadSummary {
                ports: table.ports.reload()?,
                vlans: table.vlans.reload()?,
                next_hops: table.neighbors.reload()?,
                next_hop_groups: table.next_hop_groups.reload()?,
                routes: table.routes.reload()?,
            };
            info!("Warm boot reload: {:?}", table.reloaded);
        }
        table.virtual_routers.add_virtual_router(RouterId::DEFAULT)?;
        Ok(table)
    }

    pub fn api(&self) -> &Arc<dyn SaiApi> {
        &self.api
    }

    pub fn reloaded(&self) -> ReloadSummary {
        self.reloaded
    }

    pub fn switch_id(&self) -> ManagerResult<SwitchOid> {
        self.switch.switch_id()
    }

    pub fn set_src_mac(&mut self, mac: MacAddress) -> ManagerResult<bool> {
        self.switch.set_src_mac(mac)
    }

    pub fn switch(&self) -> &SwitchManager {
        &self.switch
    }

    pub fn virtual_routers(&self) -> &VirtualRouterManager {
        &self.virtual_routers
    }

    pub fn add_virtual_router(&mut self, router: RouterId) -> ManagerResult<VirtualRouterOid> {
        self.virtual_routers.add_virtual_router(router)
    }

    pub fn ports(&self) -> &PortManager {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut PortManager {
        &mut self.ports
    }

    pub fn vlans(&self) -> &VlanManager {
        &self.vlans
    }

    pub fn neighbors(&self) -> &NeighborManager {
        &self.neighbors
    }

    pub fn next_hop_groups(&self) -> &NextHopGroupManager {
        &self.next_hop_groups
    }

    pub fn routes(&self) -> &RouteManager {
        &self.routes
    }

    pub fn process_vlan_delta(
        &mut self,
        changes: &[(&VlanId, DeltaValue<'_, VlanConfig>)],
    ) -> ManagerResult<()> {
        self.vlans.process_vlan_delta(changes, &self.ports)
    }

    pub fn set_neighbor(&mut self, config: &NeighborConfig) -> ManagerResult<()> {
        self.neighbors
            .set_neighbor(config, &mut self.next_hop_groups)
    }

    pub fn remove_neighbor(&mut self, key: &NeighborKey) -> ManagerResult<()> {
        self.neighbors
            .remove_neighbor(key, &mut self.next_hop_groups)
    }

    pub fn resolve_neighbor(&mut self, key: NeighborKey, mac: MacAddress) -> ManagerResult<()> {
        self.neighbors
            .resolve(key, mac, &mut self.next_hop_groups)
    }

    pub fn unresolve_neighbor(&mut self, key: &NeighborKey) -> ManagerResult<()> {
        self.neighbors
            .unresolve(key, &mut self.next_hop_groups)
    }

    pub fn add_route(
        &mut self,
        router: VirtualRouterOid,
        config: &RouteConfig,
    ) -> ManagerResult<()> {
        self.routes
            .add_route(router, config, &mut self.next_hop_groups)?;
        Ok(())
    }

    pub fn remove_route(
        &mut self,
        router: VirtualRouterOid,
        prefix: IpPrefix,
    ) -> ManagerResult<()> {
        self.routes
            .remove_route(router, prefix, &mut self.next_hop_groups)
    }

    /// Removes reloaded objects nothing claimed, dependents before the
    /// objects they reference.
    pub fn remove_unclaimed(&mut self) -> ManagerResult<usize> {
        let mut removed = self.routes.remove_unclaimed()?;
        removed += self.next_hop_groups.remove_unclaimed()?;
        removed += self.neighbors.remove_unclaimed(&mut self.next_hop_groups)?;
        removed += self.vlans.remove_unclaimed()?;
        removed += self.ports.remove_unclaimed()?;
        Ok(removed)
    }
}
