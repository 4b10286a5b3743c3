use crate::error::ManagerResult;
use crate::nhg::{NeighborKey, NextHopGroupManager};
use crate::state::NeighborConfig;
use log::{debug, info};
use sonic_orch_common::{create_oid_object, ObjectStore, ObjectTraits};
use sonic_sai::schema::next_hop;
use sonic_sai::{
    AdapterKey, AttrValue, AttributeSet, NextHopKind, NextHopOid, ObjectType, RawSaiObjectId,
    SaiApi, SaiError, SaiResult,
};
use sonic_types::{InterfaceId, MacAddress};
use std::sync::Arc;

pub struct NextHopTraits;

impl ObjectTraits for NextHopTraits {
    const OBJECT_TYPE: ObjectType = ObjectType::NextHop;
    type AdapterKey = NextHopOid;
    type HostKey = NeighborKey;

    fn create(
        api: &dyn SaiApi,
        switch_id: RawSaiObjectId,
        _host_key: &NeighborKey,
        attrs: &AttributeSet,
    ) -> SaiResult<NextHopOid> {
        create_oid_object::<NextHopKind>(api, switch_id, attrs)
    }

    fn adapter_key_from(key: &AdapterKey) -> Option<NextHopOid> {
        NextHopOid::from_adapter_key(key)
    }

    fn host_key(
        _api: &dyn SaiApi,
        key: &NextHopOid,
        attrs: &AttributeSet,
    ) -> SaiResult<NeighborKey> {
        let ip = attrs.get(next_hop::IP).and_then(AttrValue::as_ip);
        let interface = attrs
            .get(next_hop::INTERFACE_ID)
            .and_then(AttrValue::as_u32)
            .map(InterfaceId::new);
        match (ip, interface) {
            (Some(ip), Some(interface)) => Ok(NeighborKey::new(ip, interface)),
            _ => Err(SaiError::internal(format!("next hop {} has no neighbor", key))),
        }
    }
}

/// Next-hop objects for resolved neighbors.
pub struct NeighborManager {
    store: ObjectStore<NextHopTraits>,
}

impl NeighborManager {
    pub fn new(api: Arc<dyn SaiApi>, switch_id: RawSaiObjectId) -> Self {
        Self {
            store: ObjectStore::new(api, switch_id),
        }
    }

    pub fn reload(&mut self) -> ManagerResult<usize> {
        Ok(self.store.reload()?)
    }

    /// Programs or unprograms the next hop of a desired neighbor entry.
    pub fn set_neighbor(
        &mut self,
        config: &NeighborConfig,
        nhg: &mut NextHopGroupManager,
    ) -> ManagerResult<()> {
        let key = config.key();
        match config.mac {
            Some(mac) => self.resolve(key, mac, nhg),
            None => self.unresolve(&key, nhg),
        }
    }

    pub fn remove_neighbor(
        &mut self,
        key: &NeighborKey,
        nhg: &mut NextHopGroupManager,
    ) -> ManagerResult<()> {
        self.unresolve(key, nhg)
    }

    /// Records a resolution learned outside of desired state.
    pub fn resolve(
        &mut self,
        key: NeighborKey,
        mac: MacAddress,
        nhg: &mut NextHopGroupManager,
    ) -> ManagerResult<()> {
        let attrs = AttributeSet::new()
            .with(next_hop::IP, AttrValue::Ip(key.ip))
            .with(next_hop::INTERFACE_ID, AttrValue::U32(key.interface.as_raw()))
            .with(next_hop::DST_MAC, AttrValue::Mac(mac));
        let oid = self.store.set_object(key, attrs)?.adapter_key();
        let groups = nhg.handle_resolved_neighbor(&key, oid)?;
        debug!("Neighbor {} resolved to {} ({} groups)", key, mac, groups);
        Ok(())
    }

    /// Withdraws a neighbor's next hop after pointing its group members away.
    pub fn unresolve(
        &mut self,
        key: &NeighborKey,
        nhg: &mut NextHopGroupManager,
    ) -> ManagerResult<()> {
        if self.store.get(key).is_none() {
            return Ok(());
        }
        let groups = nhg.handle_unresolved_neighbor(key)?;
        self.store.remove(key)?;
        info!("Neighbor {} unresolved ({} groups now drop)", key, groups);
        Ok(())
    }

    pub fn next_hop(&self, key: &NeighborKey) -> Option<NextHopOid> {
        self.store.adapter_key(key)
    }

    pub fn is_resolved(&self, key: &NeighborKey) -> bool {
        self.store.get(key).is_some()
    }

    pub fn remove_unclaimed(&mut self, nhg: &mut NextHopGroupManager) -> ManagerResult<usize> {
        let unclaimed = self.store.unclaimed_keys();
        for key in &unclaimed {
            self.unresolve(key, nhg)?;
        }
        Ok(unclaimed.len())
    }

    pub fn store(&self) -> &ObjectStore<NextHopTraits> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nhg::{NextHop, NextHopSet};
    use crate::switch::SwitchManager;
    use pretty_assertions::assert_eq;
    use sonic_sai::schema::next_hop_group_member;
    use sonic_sai::{FakeSai, NULL_OBJECT_ID};

    struct Fixture {
        fake: Arc<FakeSai>,
        neighbors: NeighborManager,
        nhg: NextHopGroupManager,
    }

    fn fixture() -> Fixture {
        let fake = Arc::new(FakeSai::new());
        let switch_id = SwitchManager::new(fake.clone()).init_switch().unwrap().as_raw();
        Fixture {
            neighbors: NeighborManager::new(fake.clone(), switch_id),
            nhg: NextHopGroupManager::new(fake.clone(), switch_id),
            fake,
        }
    }

    fn mac() -> MacAddress {
        "02:00:00:00:00:0a".parse().unwrap()
    }

    #[test]
    fn test_resolved_neighbor_creates_next_hop() {
        let mut f = fixture();
        let config =
            NeighborConfig::resolved("10.0.0.1".parse().unwrap(), InterfaceId::new(1), mac());
        f.neighbors.set_neighbor(&config, &mut f.nhg).unwrap();

        assert!(f.neighbors.is_resolved(&config.key()));
        assert_eq!(f.fake.count(ObjectType::NextHop), 1);
        assert_eq!(f.nhg.resolved_next_hop(&config.key()), f.neighbors.next_hop(&config.key()));
    }

    #[test]
    fn test_loss_of_resolution_points_members_away_first() {
        let mut f = fixture();
        let config =
            NeighborConfig::resolved("10.0.0.1".parse().unwrap(), InterfaceId::new(1), mac());
        f.neighbors.set_neighbor(&config, &mut f.nhg).unwrap();
        let paths: NextHopSet = [NextHop::new(config.ip, config.interface)].into_iter().collect();
        f.nhg.inc_ref_or_add_next_hop_group(&paths).unwrap();

        let unresolved = NeighborConfig::unresolved(config.ip, config.interface);
        f.neighbors.set_neighbor(&unresolved, &mut f.nhg).unwrap();

        assert_eq!(f.fake.count(ObjectType::NextHop), 0);
        let handle = f.nhg.get_next_hop_group_handle(&paths).unwrap();
        let member = handle.member(&NextHop::new(config.ip, config.interface)).unwrap();
        let attrs = f.fake.attributes(&member.adapter_key()).unwrap();
        assert_eq!(
            attrs.get(next_hop_group_member::NEXT_HOP_ID),
            Some(&AttrValue::Oid(NULL_OBJECT_ID))
        );
    }

    #[test]
    fn test_removing_unknown_neighbor_is_noop() {
        let mut f = fixture();
        f.fake.clear_calls();
        let key = NeighborKey::new("10.0.0.9".parse().unwrap(), InterfaceId::new(2));
        f.neighbors.remove_neighbor(&key, &mut f.nhg).unwrap();
        assert!(f.fake.calls().is_empty());
    }

    #[test]
    fn test_mac_change_updates_in_place() {
        let mut f = fixture();
        let config =
            NeighborConfig::resolved("10.0.0.1".parse().unwrap(), InterfaceId::new(1), mac());
        f.neighbors.set_neighbor(&config, &mut f.nhg).unwrap();
        let oid = f.neighbors.next_hop(&config.key()).unwrap();
        f.fake.clear_calls();

        let moved = NeighborConfig::resolved(
            config.ip,
            config.interface,
            "02:00:00:00:00:0b".parse().unwrap(),
        );
        f.neighbors.set_neighbor(&moved, &mut f.nhg).unwrap();
        assert_eq!(f.neighbors.next_hop(&config.key()), Some(oid));
        assert_eq!(f.fake.calls().len(), 1);
    }
}
