use crate::error::{ManagerError, ManagerResult};
use crate::ports::PortManager;
use crate::state::{DeltaValue, VlanConfig, VlanTagging};
use log::{debug, info};
use sonic_orch_common::{create_oid_object, DependencyIndex, ObjectStore, ObjectTraits};
use sonic_sai::schema::{vlan, vlan_member};
use sonic_sai::{
    AdapterKey, AttrValue, AttributeSet, ObjectType, PortOid, RawSaiObjectId, SaiApi, SaiError,
    SaiResult, VlanKind, VlanMemberKind, VlanMemberOid, VlanOid,
};
use sonic_types::{PortId, VlanId};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct VlanTraits;

impl ObjectTraits for VlanTraits {
    const OBJECT_TYPE: ObjectType = ObjectType::Vlan;
    type AdapterKey = VlanOid;
    type HostKey = VlanId;

    fn create(
        api: &dyn SaiApi,
        switch_id: RawSaiObjectId,
        _host_key: &VlanId,
        attrs: &AttributeSet,
    ) -> SaiResult<VlanOid> {
        create_oid_object::<VlanKind>(api, switch_id, attrs)
    }

    fn adapter_key_from(key: &AdapterKey) -> Option<VlanOid> {
        VlanOid::from_adapter_key(key)
    }

    fn host_key(_api: &dyn SaiApi, key: &VlanOid, attrs: &AttributeSet) -> SaiResult<VlanId> {
        attrs
            .get(vlan::VLAN_ID)
            .and_then(AttrValue::as_u16)
            .and_then(|id| VlanId::new(id).ok())
            .ok_or_else(|| SaiError::internal(format!("vlan {} has no valid VLAN_ID", key)))
    }
}

/// A membership is identified by the VLAN and port objects it joins.
pub struct VlanMemberTraits;

impl ObjectTraits for VlanMemberTraits {
    const OBJECT_TYPE: ObjectType = ObjectType::VlanMember;
    type AdapterKey = VlanMemberOid;
    type HostKey = (VlanOid, PortOid);

    fn create(
        api: &dyn SaiApi,
        switch_id: RawSaiObjectId,
        _host_key: &(VlanOid, PortOid),
        attrs: &AttributeSet,
    ) -> SaiResult<VlanMemberOid> {
        create_oid_object::<VlanMemberKind>(api, switch_id, attrs)
    }

    fn adapter_key_from(key: &AdapterKey) -> Option<VlanMemberOid> {
        VlanMemberOid::from_adapter_key(key)
    }

    fn host_key(
        _api: &dyn SaiApi,
        key: &VlanMemberOid,
        attrs: &AttributeSet,
    ) -> SaiResult<(VlanOid, PortOid)> {
        let vlan = attrs
            .get(vlan_member::VLAN_ID)
            .and_then(AttrValue::as_oid)
            .and_then(VlanOid::from_raw);
        let port = attrs
            .get(vlan_member::PORT_ID)
            .and_then(AttrValue::as_oid)
            .and_then(PortOid::from_raw);
        vlan.zip(port)
            .ok_or_else(|| SaiError::internal(format!("vlan member {} is missing its ends", key)))
    }
}

fn tagging_mode(tagging: VlanTagging) -> i32 {
    match tagging {
        VlanTagging::Untagged => vlan_member::TAGGING_MODE_UNTAGGED,
        VlanTagging::Tagged => vlan_member::TAGGING_MODE_TAGGED,
    }
}

/// A programmed VLAN and the memberships hanging off it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanHandle {
    oid: VlanOid,
    members: BTreeMap<PortId, VlanMemberOid>,
}

impl VlanHandle {
    pub fn oid(&self) -> VlanOid {
        self.oid
    }

    pub fn members(&self) -> &BTreeMap<PortId, VlanMemberOid> {
        &self.members
    }
}

pub struct VlanManager {
    vlans: ObjectStore<VlanTraits>,
    members: ObjectStore<VlanMemberTraits>,
    handles: BTreeMap<VlanId, VlanHandle>,
    by_port: DependencyIndex<PortId, VlanId>,
}

impl VlanManager {
    pub fn new(api: Arc<dyn SaiApi>, switch_id: RawSaiObjectId) -> Self {
        Self {
            vlans: ObjectStore::new(Arc::clone(&api), switch_id),
            members: ObjectStore::new(api, switch_id),
            handles: BTreeMap::new(),
            by_port: DependencyIndex::new(),
        }
    }

    pub fn reload(&mut self) -> ManagerResult<usize> {
        let vlans = self.vlans.reload()?;
        self.members.reload()?;
        Ok(vlans)
    }

    pub fn add_vlan(&mut self, config: &VlanConfig, ports: &PortManager) -> ManagerResult<VlanOid> {
        if self.handles.contains_key(&config.id) {
            return self.change_vlan(config, ports);
        }

        let attrs = AttributeSet::new().with(vlan::VLAN_ID, AttrValue::U16(config.id.as_u16()));
        let oid = self.vlans.set_object(config.id, attrs)?.adapter_key();
        self.handles.insert(
            config.id,
            VlanHandle {
                oid,
                members: BTreeMap::new(),
            },
        );
        for (port, tagging) in &config.members {
            self.set_member(config.id, oid, *port, *tagging, ports)?;
        }
        info!("{} programmed with {} members", config.id, config.members.len());
        Ok(oid)
    }

    /// Brings an existing VLAN's memberships in line with `config`.
    pub fn change_vlan(
        &mut self,
        config: &VlanConfig,
        ports: &PortManager,
    ) -> ManagerResult<VlanOid> {
        let handle = self
            .handles
            .get(&config.id)
            .ok_or_else(|| ManagerError::not_found("vlan", config.id))?;
        let oid = handle.oid;
        let stale: Vec<PortId> = handle
            .members
            .keys()
            .filter(|port| !config.members.contains_key(*port))
            .copied()
            .collect();

        for port in stale {
            self.remove_member(config.id, port)?;
        }
        for (port, tagging) in &config.members {
            self.set_member(config.id, oid, *port, *tagging, ports)?;
        }
        debug!("{} reconciled", config.id);
        Ok(oid)
    }

    pub fn remove_vlan(&mut self, id: VlanId) -> ManagerResult<()> {
        let ports: Vec<PortId> = self
            .handles
            .get(&id)
            .ok_or_else(|| ManagerError::not_found("vlan", id))?
            .members
            .keys()
            .copied()
            .collect();
        for port in ports {
            self.remove_member(id, port)?;
        }
        self.vlans.remove(&id)?;
        self.handles.remove(&id);
        info!("{} removed", id);
        Ok(())
    }

    /// Applies VLAN entries of a state delta, in the order given.
    pub fn process_vlan_delta(
        &mut self,
        changes: &[(&VlanId, DeltaValue<'_, VlanConfig>)],
        ports: &PortManager,
    ) -> ManagerResult<()> {
        for (id, change) in changes {
            match change {
                DeltaValue::Added(config) => {
                    self.add_vlan(config, ports)?;
                }
                DeltaValue::Changed { new, .. } => {
                    self.change_vlan(new, ports)?;
                }
                DeltaValue::Removed(_) => self.remove_vlan(**id)?,
            }
        }
        Ok(())
    }

    fn set_member(
        &mut self,
        id: VlanId,
        vlan_oid: VlanOid,
        port: PortId,
        tagging: VlanTagging,
        ports: &PortManager,
    ) -> ManagerResult<()> {
        let port_oid = ports
            .port_oid(port)
            .ok_or_else(|| ManagerError::not_found("port", port))?;
        let attrs = AttributeSet::new()
            .with(vlan_member::VLAN_ID, AttrValue::Oid(vlan_oid.as_raw()))
            .with(vlan_member::PORT_ID, AttrValue::Oid(port_oid.as_raw()))
            .with(vlan_member::TAGGING_MODE, AttrValue::S32(tagging_mode(tagging)));
        let member = self
            .members
            .set_object((vlan_oid, port_oid), attrs)?
            .adapter_key();

        if let Some(handle) = self.handles.get_mut(&id) {
            handle.members.insert(port, member);
        }
        self.by_port.add(port, id);
        Ok(())
    }

    fn remove_member(&mut self, id: VlanId, port: PortId) -> ManagerResult<()> {
        let handle = self
            .handles
            .get_mut(&id)
            .ok_or_else(|| ManagerError::not_found("vlan", id))?;
        let member = handle
            .members
            .get(&port)
            .copied()
            .ok_or_else(|| ManagerError::not_found("vlan member", port))?;
        let key = self
            .members
            .find_by_adapter_key(&member)
            .copied()
            .ok_or_else(|| ManagerError::Invariant(format!("{} member {} untracked", id, port)))?;

        self.members.remove(&key)?;
        handle.members.remove(&port);
        self.by_port.remove(&port, &id);
        Ok(())
    }

    pub fn get_vlan_handle(&self, id: VlanId) -> Option<&VlanHandle> {
        self.handles.get(&id)
    }

    pub fn get_vlan_id(&self, oid: VlanOid) -> Option<VlanId> {
        self.vlans.find_by_adapter_key(&oid).copied()
    }

    pub fn vlan_ids_by_port(&self, port: PortId) -> Vec<VlanId> {
        self.by_port.dependents(&port).copied().collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Removes reloaded VLANs nothing claimed, memberships first.
    pub fn remove_unclaimed(&mut self) -> ManagerResult<usize> {
        let members = self.members.unclaimed_keys();
        for key in &members {
            self.members.remove(key)?;
        }
        let vlans = self.vlans.unclaimed_keys();
        for key in &vlans {
            self.vlans.remove(key)?;
        }
        Ok(members.len() + vlans.len())
    }
}
