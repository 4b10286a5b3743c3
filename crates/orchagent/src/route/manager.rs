use crate::error::ManagerResult;
use crate::nhg::{NextHopGroupManager, NextHopSet};
use crate::state::{RouteAction, RouteConfig};
use log::debug;
use sonic_orch_common::{ObjectStore, ObjectTraits, SaiObject};
use sonic_sai::schema::route;
use sonic_sai::{
    AdapterKey, AttrValue, AttributeSet, ObjectType, RawSaiObjectId, RouteEntry, SaiApi,
    SaiResult, VirtualRouterOid,
};
use sonic_types::IpPrefix;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Route entries are their own adapter key.
pub struct RouteTraits;

impl ObjectTraits for RouteTraits {
    const OBJECT_TYPE: ObjectType = ObjectType::Route;
    type AdapterKey = RouteEntry;
    type HostKey = RouteEntry;

    fn create(
        api: &dyn SaiApi,
        _switch_id: RawSaiObjectId,
        host_key: &RouteEntry,
        attrs: &AttributeSet,
    ) -> SaiResult<RouteEntry> {
        api.create_route(host_key, attrs)?;
        Ok(*host_key)
    }

    fn adapter_key_from(key: &AdapterKey) -> Option<RouteEntry> {
        match key {
            AdapterKey::Route(entry) => Some(*entry),
            AdapterKey::Object { .. } => None,
        }
    }

    fn host_key(
        _api: &dyn SaiApi,
        key: &RouteEntry,
        _attrs: &AttributeSet,
    ) -> SaiResult<RouteEntry> {
        Ok(*key)
    }
}

pub struct RouteManager {
    store: ObjectStore<RouteTraits>,
    /// Next-hop set each forwarding route holds a group reference on.
    next_hops: BTreeMap<RouteEntry, NextHopSet>,
}

impl RouteManager {
    pub fn new(api: Arc<dyn SaiApi>, switch_id: RawSaiObjectId) -> Self {
        Self {
            store: ObjectStore::new(api, switch_id),
            next_hops: BTreeMap::new(),
        }
    }

    pub fn reload(&mut self) -> ManagerResult<usize> {
        Ok(self.store.reload()?)
    }

    fn entry(&self, router: VirtualRouterOid, prefix: IpPrefix) -> RouteEntry {
        RouteEntry {
            switch_id: self.store.switch_id(),
            virtual_router_id: router.as_raw(),
            destination: prefix,
        }
    }

    /// Programs a route. A route that changes next-hop set takes its new
    /// group reference before it releases the old one.
    pub fn add_route(
        &mut self,
        router: VirtualRouterOid,
        config: &RouteConfig,
        nhg: &mut NextHopGroupManager,
    ) -> ManagerResult<RouteEntry> {
        let entry = self.entry(router, config.prefix);
        let attrs = match &config.action {
            RouteAction::Drop => AttributeSet::new()
                .with(route::PACKET_ACTION, AttrValue::S32(route::PACKET_ACTION_DROP)),
            RouteAction::ToCpu => AttributeSet::new()
                .with(route::PACKET_ACTION, AttrValue::S32(route::PACKET_ACTION_TRAP)),
            RouteAction::NextHops(set) => {
                let group = nhg.inc_ref_or_add_next_hop_group(set)?;
                AttributeSet::new()
                    .with(route::PACKET_ACTION, AttrValue::S32(route::PACKET_ACTION_FORWARD))
                    .with(route::NEXT_HOP_ID, AttrValue::Oid(group.as_raw()))
            }
        };
        self.store.set_object(entry, attrs)?;

        let previous = match &config.action {
            RouteAction::NextHops(set) => self.next_hops.insert(entry, set.clone()),
            RouteAction::Drop | RouteAction::ToCpu => self.next_hops.remove(&entry),
        };
        if let Some(previous) = previous {
            nhg.dec_ref_next_hop_group(&previous)?;
        }
        debug!("Route {} programmed", entry);
        Ok(entry)
    }

    pub fn remove_route(
        &mut self,
        router: VirtualRouterOid,
        prefix: IpPrefix,
        nhg: &mut NextHopGroupManager,
    ) -> ManagerResult<()> {
        let entry = self.entry(router, prefix);
        self.store.remove(&entry)?;
        if let Some(set) = self.next_hops.remove(&entry) {
            nhg.dec_ref_next_hop_group(&set)?;
        }
        debug!("Route {} removed", entry);
        Ok(())
    }

    pub fn get_route(
        &self,
        router: VirtualRouterOid,
        prefix: IpPrefix,
    ) -> Option<&SaiObject<RouteTraits>> {
        self.store.get(&self.entry(router, prefix))
    }

    pub fn next_hop_set(&self, router: VirtualRouterOid, prefix: IpPrefix) -> Option<&NextHopSet> {
        self.next_hops.get(&self.entry(router, prefix))
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Removes reloaded routes no desired route claimed.
    pub fn remove_unclaimed(&mut self) -> ManagerResult<usize> {
        let unclaimed = self.store.unclaimed_keys();
        for entry in &unclaimed {
            self.store.remove(entry)?;
        }
        Ok(unclaimed.len())
    }

    pub fn store(&self) -> &ObjectStore<RouteTraits> {
        &self.store
    }
}
