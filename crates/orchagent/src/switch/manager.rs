//! The per-switch singleton object.

use crate::error::{ManagerError, ManagerResult};
use log::info;
use sonic_orch_common::{create_oid_object, ObjectStore, ObjectTraits};
use sonic_sai::schema::switch;
use sonic_sai::{
    AdapterKey, AttrValue, AttributeSet, ObjectType, RawSaiObjectId, SaiApi, SaiResult,
    SwitchKind, SwitchOid,
};
use sonic_types::MacAddress;
use std::sync::Arc;

/// There is exactly one switch, so its host key carries no information.
pub struct SwitchTraits;

impl ObjectTraits for SwitchTraits {
    const OBJECT_TYPE: ObjectType = ObjectType::Switch;
    type AdapterKey = SwitchOid;
    type HostKey = ();

    fn create(
        api: &dyn SaiApi,
        switch_id: RawSaiObjectId,
        _host_key: &(),
        attrs: &AttributeSet,
    ) -> SaiResult<SwitchOid> {
        create_oid_object::<SwitchKind>(api, switch_id, attrs)
    }

    fn adapter_key_from(key: &AdapterKey) -> Option<SwitchOid> {
        SwitchOid::from_adapter_key(key)
    }

    fn host_key(_api: &dyn SaiApi, _key: &SwitchOid, _attrs: &AttributeSet) -> SaiResult<()> {
        Ok(())
    }
}

pub struct SwitchManager {
    store: ObjectStore<SwitchTraits>,
}

impl SwitchManager {
    pub fn new(api: Arc<dyn SaiApi>) -> Self {
        Self {
            store: ObjectStore::new(api, 0),
        }
    }

    pub fn reload(&mut self) -> ManagerResult<usize> {
        Ok(self.store.reload()?)
    }

    /// Creates the switch, or returns the one already present.
    pub fn init_switch(&mut self) -> ManagerResult<SwitchOid> {
        if let Some(oid) = self.store.adapter_key(&()) {
            self.store.claim(&());
            return Ok(oid);
        }
        let attrs = AttributeSet::new().with(switch::INIT_SWITCH, AttrValue::Bool(true));
        let oid = self.store.set_object((), attrs)?.adapter_key();
        info!("Initialized switch {}", oid);
        Ok(oid)
    }

    pub fn switch_id(&self) -> ManagerResult<SwitchOid> {
        self.store
            .adapter_key(&())
            .ok_or_else(|| ManagerError::not_found("switch", "instance"))
    }

    /// Source MAC for routed traffic. Zero restores the hardware default.
    pub fn set_src_mac(&mut self, mac: MacAddress) -> ManagerResult<bool> {
        Ok(self
            .store
            .set_attribute(&(), switch::SRC_MAC, AttrValue::Mac(mac))?)
    }

    pub fn src_mac(&self) -> MacAddress {
        self.store
            .get(&())
            .and_then(|object| object.attribute(switch::SRC_MAC))
            .and_then(AttrValue::as_mac)
            .unwrap_or(MacAddress::ZERO)
    }

    pub fn store(&self) -> &ObjectStore<SwitchTraits> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sonic_sai::FakeSai;

    #[test]
    fn test_init_is_idempotent() {
        let fake = Arc::new(FakeSai::new());
        let mut manager = SwitchManager::new(fake.clone());
        assert!(manager.switch_id().is_err());

        let first = manager.init_switch().unwrap();
        let second = manager.init_switch().unwrap();
        assert_eq!(first, second);
        assert_eq!(fake.count(ObjectType::Switch), 1);
        assert_eq!(manager.switch_id().unwrap(), first);
    }

    #[test]
    fn test_src_mac_written_once() {
        let fake = Arc::new(FakeSai::new());
        let mut manager = SwitchManager::new(fake.clone());
        manager.init_switch().unwrap();
        fake.clear_calls();

        let mac: MacAddress = "02:00:00:00:00:01".parse().unwrap();
        assert!(manager.set_src_mac(mac).unwrap());
        assert!(!manager.set_src_mac(mac).unwrap());
        assert_eq!(fake.calls().len(), 1);
        assert_eq!(manager.src_mac(), mac);
    }

    #[test]
    fn test_reload_keeps_switch_and_mac() {
        let fake = Arc::new(FakeSai::new());
        let mac: MacAddress = "02:00:00:00:00:02".parse().unwrap();
        let oid = {
            let mut manager = SwitchManager::new(fake.clone());
            let oid = manager.init_switch().unwrap();
            manager.set_src_mac(mac).unwrap();
            oid
        };
        fake.clear_calls();

        let mut manager = SwitchManager::new(fake.clone());
        assert_eq!(manager.reload().unwrap(), 1);
        assert_eq!(manager.init_switch().unwrap(), oid);
        assert!(!manager.set_src_mac(mac).unwrap());
        assert!(fake.calls().is_empty());
    }
}
