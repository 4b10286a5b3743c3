use crate::error::{ManagerError, ManagerResult};
use crate::state::PortConfig;
use log::debug;
use sonic_orch_common::{create_oid_object, ObjectStore, ObjectTraits, SaiObject};
use sonic_sai::schema::port;
use sonic_sai::{
    AdapterKey, AttrValue, AttributeSet, ObjectType, PortKind, PortOid, RawSaiObjectId, SaiApi,
    SaiError, SaiResult,
};
use sonic_types::{PortId, PortSpeed};
use std::sync::Arc;

/// Ports are identified by their first hardware lane.
pub struct PortTraits;

impl PortTraits {
    pub fn lanes(id: PortId) -> Vec<u32> {
        vec![id.as_raw()]
    }
}

impl ObjectTraits for PortTraits {
    const OBJECT_TYPE: ObjectType = ObjectType::Port;
    type AdapterKey = PortOid;
    type HostKey = PortId;

    fn create(
        api: &dyn SaiApi,
        switch_id: RawSaiObjectId,
        _host_key: &PortId,
        attrs: &AttributeSet,
    ) -> SaiResult<PortOid> {
        create_oid_object::<PortKind>(api, switch_id, attrs)
    }

    fn adapter_key_from(key: &AdapterKey) -> Option<PortOid> {
        PortOid::from_adapter_key(key)
    }

    fn host_key(_api: &dyn SaiApi, key: &PortOid, attrs: &AttributeSet) -> SaiResult<PortId> {
        attrs
            .get(port::HW_LANE_LIST)
            .and_then(AttrValue::as_u32_list)
            .and_then(|lanes| lanes.first().copied())
            .map(PortId::new)
            .ok_or_else(|| SaiError::internal(format!("{} has no hardware lanes", key)))
    }
}

/// Attributes owned by the port group rather than by port configuration.
const GROUP_OWNED: [sonic_sai::AttrId; 2] = [port::LINK_SCAN_ENABLE, port::ACTIVE_LANES];

pub struct PortManager {
    store: ObjectStore<PortTraits>,
}

impl PortManager {
    pub fn new(api: Arc<dyn SaiApi>, switch_id: RawSaiObjectId) -> Self {
        Self {
            store: ObjectStore::new(api, switch_id),
        }
    }

    pub fn reload(&mut self) -> ManagerResult<usize> {
        Ok(self.store.reload()?)
    }

    fn desired_attributes(&self, config: &PortConfig) -> AttributeSet {
        let mut attrs = AttributeSet::new()
            .with(port::HW_LANE_LIST, AttrValue::U32List(PortTraits::lanes(config.id)))
            .with(port::SPEED, AttrValue::U32(config.speed.mbps()))
            .with(port::ADMIN_STATE, AttrValue::Bool(config.is_enabled()))
            .with(port::FEC_MODE, AttrValue::S32(config.fec.as_hw()))
            .with(
                port::INTERNAL_LOOPBACK_MODE,
                AttrValue::S32(i32::from(config.loopback)),
            );
        if let Some(current) = self.store.get(&config.id) {
            for id in GROUP_OWNED {
                if let Some(value) = current.attribute(id) {
                    attrs.set(id, value.clone());
                }
            }
        }
        attrs
    }

    /// Programs a port to match `config`, creating it if needed.
    pub fn add_port(&mut self, config: &PortConfig) -> ManagerResult<PortOid> {
        let attrs = self.desired_attributes(config);
        let oid = self.store.set_object(config.id, attrs)?.adapter_key();
        debug!("Port {} programmed as {}", config.id, oid);
        Ok(oid)
    }

    pub fn change_port(&mut self, old: &PortConfig, new: &PortConfig) -> ManagerResult<PortOid> {
        if old.id != new.id || self.store.get(&new.id).is_none() {
            return Err(ManagerError::not_found("port", new.id));
        }
        self.add_port(new)
    }

    pub fn remove_port(&mut self, id: PortId) -> ManagerResult<()> {
        if self.store.get(&id).is_none() {
            return Err(ManagerError::not_found("port", id));
        }
        Ok(self.store.remove(&id)?)
    }

    pub fn get_port_handle(&self, id: PortId) -> Option<&SaiObject<PortTraits>> {
        self.store.get(&id)
    }

    pub fn port_oid(&self, id: PortId) -> Option<PortOid> {
        self.store.adapter_key(&id)
    }

    pub fn port_id_by_oid(&self, oid: PortOid) -> Option<PortId> {
        self.store.find_by_adapter_key(&oid).copied()
    }

    pub fn contains(&self, id: PortId) -> bool {
        self.store.get(&id).is_some()
    }

    fn effective(&self, id: PortId, attr: sonic_sai::AttrId) -> Option<AttrValue> {
        let object = self.store.get(&id)?;
        PortTraits::schema().effective_value(object.attributes(), attr)
    }

    pub fn is_enabled(&self, id: PortId) -> Option<bool> {
        self.effective(id, port::ADMIN_STATE)
            .and_then(|value| value.as_bool())
    }

    pub fn speed(&self, id: PortId) -> Option<PortSpeed> {
        self.effective(id, port::SPEED)
            .and_then(|value| value.as_u32())
            .and_then(PortSpeed::from_mbps)
    }

    /// Serdes lanes currently driven by the port.
    pub fn active_lanes(&self, id: PortId) -> Option<u32> {
        self.effective(id, port::ACTIVE_LANES)
            .and_then(|value| value.as_u32())
    }

    pub fn set_admin_state(&mut self, id: PortId, enabled: bool) -> ManagerResult<bool> {
        Ok(self
            .store
            .set_attribute(&id, port::ADMIN_STATE, AttrValue::Bool(enabled))?)
    }

    pub fn set_link_scan(&mut self, id: PortId, enabled: bool) -> ManagerResult<bool> {
        Ok(self
            .store
            .set_attribute(&id, port::LINK_SCAN_ENABLE, AttrValue::Bool(enabled))?)
    }

    pub fn set_active_lanes(&mut self, id: PortId, lanes: u32) -> ManagerResult<bool> {
        Ok(self
            .store
            .set_attribute(&id, port::ACTIVE_LANES, AttrValue::U32(lanes))?)
    }

    /// Removes reloaded ports no desired port claimed.
    pub fn remove_unclaimed(&mut self) -> ManagerResult<usize> {
        let unclaimed = self.store.unclaimed_keys();
        for id in &unclaimed {
            self.store.remove(id)?;
        }
        Ok(unclaimed.len())
    }

    pub fn store(&self) -> &ObjectStore<PortTraits> {
        &self.store
    }
}
