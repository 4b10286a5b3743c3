use super::types::{NeighborKey, NextHop, NextHopSet};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::error::{ManagerError, ManagerResult};
use log::{debug, info};
use sonic_orch_common::{
    create_oid_object, DependencyIndex, ObjectStore, ObjectTraits, RefMap, RefRelease,
};
use sonic_sai::schema::{next_hop_group, next_hop_group_member as member};
use sonic_sai::{
    AdapterKey, AttrValue, AttributeSet, NextHopGroupKind, NextHopGroupMemberKind,
    NextHopGroupMemberOid, NextHopGroupOid, NextHopOid, ObjectType, RawSaiObjectId, SaiApi,
    SaiError, SaiResult, NULL_OBJECT_ID,
};
use sonic_types::InterfaceId;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Groups are identified by the set of paths they forward over.
pub struct NextHopGroupTraits;

impl ObjectTraits for NextHopGroupTraits {
    const OBJECT_TYPE: ObjectType = ObjectType::NextHopGroup;
    type AdapterKey = NextHopGroupOid;
    type HostKey = NextHopSet;

    fn create(
        api: &dyn SaiApi,
        switch_id: RawSaiObjectId,
        _host_key: &NextHopSet,
        attrs: &AttributeSet,
    ) -> SaiResult<NextHopGroupOid> {
        create_oid_object::<NextHopGroupKind>(api, switch_id, attrs)
    }

    fn adapter_key_from(key: &AdapterKey) -> Option<NextHopGroupOid> {
        NextHopGroupOid::from_adapter_key(key)
    }

    /// Rebuilds the path set from the group's members.
    fn host_key(
        api: &dyn SaiApi,
        key: &NextHopGroupOid,
        _attrs: &AttributeSet,
    ) -> SaiResult<NextHopSet> {
        let members = api.get_attribute(&key.adapter_key(), next_hop_group::MEMBER_LIST)?;
        let members = members
            .as_oid_list()
            .ok_or_else(|| SaiError::internal(format!("{} has no member list", key)))?;

        let mut set = NextHopSet::new();
        for oid in members {
            let member_key = NextHopGroupMemberOid::from_raw_unchecked(*oid).adapter_key();
            let mut attrs = AttributeSet::new();
            for id in [member::NEXT_HOP_IP, member::NEXT_HOP_INTERFACE, member::WEIGHT] {
                attrs.set(id, api.get_attribute(&member_key, id)?);
            }
            set.insert(member_next_hop(&member_key, &attrs)?);
        }
        Ok(set)
    }
}

/// Members are identified by their group and the path they carry.
pub struct NextHopGroupMemberTraits;

impl ObjectTraits for NextHopGroupMemberTraits {
    const OBJECT_TYPE: ObjectType = ObjectType::NextHopGroupMember;
    type AdapterKey = NextHopGroupMemberOid;
    type HostKey = (NextHopGroupOid, NextHop);

    fn create(
        api: &dyn SaiApi,
        switch_id: RawSaiObjectId,
        _host_key: &(NextHopGroupOid, NextHop),
        attrs: &AttributeSet,
    ) -> SaiResult<NextHopGroupMemberOid> {
        create_oid_object::<NextHopGroupMemberKind>(api, switch_id, attrs)
    }

    fn adapter_key_from(key: &AdapterKey) -> Option<NextHopGroupMemberOid> {
        NextHopGroupMemberOid::from_adapter_key(key)
    }

    fn host_key(
        _api: &dyn SaiApi,
        key: &NextHopGroupMemberOid,
        attrs: &AttributeSet,
    ) -> SaiResult<(NextHopGroupOid, NextHop)> {
        let group = attrs
            .get(member::NEXT_HOP_GROUP_ID)
            .and_then(AttrValue::as_oid)
            .and_then(NextHopGroupOid::from_raw)
            .ok_or_else(|| SaiError::internal(format!("member {} has no group", key)))?;
        Ok((group, member_next_hop(&key.adapter_key(), attrs)?))
    }
}

fn member_next_hop(key: &AdapterKey, attrs: &AttributeSet) -> SaiResult<NextHop> {
    let ip = attrs
        .get(member::NEXT_HOP_IP)
        .and_then(AttrValue::as_ip)
        .ok_or_else(|| SaiError::internal(format!("member {} has no next hop address", key)))?;
    let interface = attrs
        .get(member::NEXT_HOP_INTERFACE)
        .and_then(AttrValue::as_u32)
        .map(InterfaceId::new)
        .ok_or_else(|| SaiError::internal(format!("member {} has no interface", key)))?;
    let weight = attrs
        .get(member::WEIGHT)
        .and_then(AttrValue::as_u32)
        .unwrap_or(1);
    Ok(NextHop::new(ip, interface).with_weight(weight))
}

/// A programmed group and its members, shared by every route using its set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextHopGroupHandle {
    oid: NextHopGroupOid,
    members: BTreeMap<NextHop, NextHopGroupMemberOid>,
}

impl NextHopGroupHandle {
    pub fn oid(&self) -> NextHopGroupOid {
        self.oid
    }

    pub fn members(&self) -> &BTreeMap<NextHop, NextHopGroupMemberOid> {
        &self.members
    }

    pub fn member(&self, next_hop: &NextHop) -> Option<NextHopGroupMemberOid> {
        self.members.get(next_hop).copied()
    }
}

pub struct NextHopGroupManager {
    groups: ObjectStore<NextHopGroupTraits>,
    members: ObjectStore<NextHopGroupMemberTraits>,
    refs: RefMap<NextHopSet, NextHopGroupHandle>,
    dependents: DependencyIndex<NeighborKey, NextHopSet>,
    /// Forwarding id of every neighbor currently resolved.
    resolved: BTreeMap<NeighborKey, NextHopOid>,
}

impl NextHopGroupManager {
    pub fn new(api: Arc<dyn SaiApi>, switch_id: RawSaiObjectId) -> Self {
        Self {
            groups: ObjectStore::new(Arc::clone(&api), switch_id),
            members: ObjectStore::new(api, switch_id),
            refs: RefMap::new(),
            dependents: DependencyIndex::new(),
            resolved: BTreeMap::new(),
        }
    }

    /// Reloads groups and members. Reference counts are rebuilt as routes
    /// take their references again.
    pub fn reload(&mut self) -> ManagerResult<usize> {
        let groups = self.groups.reload()?;
        self.members.reload()?;

        for ((_, next_hop), object) in self.members.iter() {
            let forwarding = object
                .attribute(member::NEXT_HOP_ID)
                .and_then(AttrValue::as_oid)
                .and_then(NextHopOid::from_raw);
            if let Some(oid) = forwarding {
                self.resolved.insert(next_hop.neighbor(), oid);
            }
        }
        debug!("Seeded {} resolved neighbors from members", self.resolved.len());
        Ok(groups)
    }

    fn member_attributes(&self, group: NextHopGroupOid, next_hop: &NextHop) -> AttributeSet {
        let forwarding = self
            .resolved
            .get(&next_hop.neighbor())
            .map_or(NULL_OBJECT_ID, NextHopOid::as_raw);
        AttributeSet::new()
            .with(member::NEXT_HOP_GROUP_ID, AttrValue::Oid(group.as_raw()))
            .with(member::NEXT_HOP_IP, AttrValue::Ip(next_hop.ip))
            .with(
                member::NEXT_HOP_INTERFACE,
                AttrValue::U32(next_hop.interface.as_raw()),
            )
            .with(member::NEXT_HOP_ID, AttrValue::Oid(forwarding))
            .with(member::WEIGHT, AttrValue::U32(next_hop.weight))
    }

    /// Takes a reference on the group for `set`, programming it on first use.
    pub fn inc_ref_or_add_next_hop_group(
        &mut self,
        set: &NextHopSet,
    ) -> ManagerResult<NextHopGroupOid> {
        if let Some(handle) = self.refs.get(set) {
            let oid = handle.oid;
            let count = self.refs.inc_ref(set)?;
            debug!("Next hop group {} for {} now has {} references", oid, set, count);
            return Ok(oid);
        }
        if set.is_empty() {
            return Err(ManagerError::Unsupported(
                "next hop group without next hops".to_string(),
            ));
        }

        let group_attrs = AttributeSet::new()
            .with(next_hop_group::TYPE, AttrValue::S32(next_hop_group::TYPE_ECMP));
        let oid = self.groups.set_object(set.clone(), group_attrs)?.adapter_key();

        let mut members = BTreeMap::new();
        for next_hop in set.iter() {
            let attrs = self.member_attributes(oid, next_hop);
            let member_oid = self
                .members
                .set_object((oid, *next_hop), attrs)?
                .adapter_key();
            members.insert(*next_hop, member_oid);
            self.dependents.add(next_hop.neighbor(), set.clone());
        }

        self.refs
            .insert_new(set.clone(), NextHopGroupHandle { oid, members })?;
        info!("Next hop group {} programmed for {}", oid, set);
        audit_log!(AuditRecord::new(
            AuditCategory::ResourceCreate,
            "NextHopGroupManager",
            "add_next_hop_group"
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_id(oid.to_string())
        .with_object_type("next_hop_group")
        .with_details(serde_json::json!({
            "next_hops": set.to_string(),
            "members": set.len(),
        })));
        Ok(oid)
    }

    /// Drops a reference; the group is removed with its last reference.
    /// Returns the references left.
    pub fn dec_ref_next_hop_group(&mut self, set: &NextHopSet) -> ManagerResult<u32> {
        let handle = match self.refs.dec_ref(set)? {
            RefRelease::Remaining(count) => return Ok(count),
            RefRelease::Released(handle) => handle,
        };

        for next_hop in handle.members.keys() {
            self.members.remove(&(handle.oid, *next_hop))?;
            self.dependents.remove(&next_hop.neighbor(), set);
        }
        self.groups.remove(set)?;

        info!("Next hop group {} for {} removed", handle.oid, set);
        audit_log!(AuditRecord::new(
            AuditCategory::ResourceDelete,
            "NextHopGroupManager",
            "remove_next_hop_group"
        )
        .with_outcome(AuditOutcome::Success)
        .with_object_id(handle.oid.to_string())
        .with_object_type("next_hop_group"));
        Ok(0)
    }

    pub fn get_next_hop_group_handle(&self, set: &NextHopSet) -> Option<&NextHopGroupHandle> {
        self.refs.get(set)
    }

    pub fn ref_count(&self, set: &NextHopSet) -> u32 {
        self.refs.ref_count(set).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn groups_depending_on(&self, neighbor: &NeighborKey) -> Vec<&NextHopSet> {
        self.dependents.dependents(neighbor).collect()
    }

    pub fn resolved_next_hop(&self, neighbor: &NeighborKey) -> Option<NextHopOid> {
        self.resolved.get(neighbor).copied()
    }

    /// Points every member that uses `neighbor` at its next hop. Returns the
    /// number of groups touched.
    pub fn handle_resolved_neighbor(
        &mut self,
        neighbor: &NeighborKey,
        next_hop: NextHopOid,
    ) -> ManagerResult<usize> {
        self.resolved.insert(*neighbor, next_hop);
        self.update_members(neighbor, AttrValue::Oid(next_hop.as_raw()))
    }

    /// Makes every member that uses `neighbor` drop its share of traffic.
    pub fn handle_unresolved_neighbor(&mut self, neighbor: &NeighborKey) -> ManagerResult<usize> {
        self.resolved.remove(neighbor);
        self.update_members(neighbor, AttrValue::Oid(NULL_OBJECT_ID))
    }

    fn update_members(&mut self, neighbor: &NeighborKey, value: AttrValue) -> ManagerResult<usize> {
        let mut touched = 0;
        for set in self.dependents.dependents(neighbor) {
            let handle = self.refs.get(set).ok_or_else(|| {
                ManagerError::Invariant(format!(
                    "{} depends on {} but is not tracked",
                    set, neighbor
                ))
            })?;
            for next_hop in handle.members.keys().filter(|nh| nh.neighbor() == *neighbor) {
                self.members
                    .set_attribute(&(handle.oid, *next_hop), member::NEXT_HOP_ID, value.clone())?;
            }
            touched += 1;
        }
        debug!("Neighbor {} update reached {} next hop groups", neighbor, touched);
        Ok(touched)
    }

    /// Removes reloaded groups no route claimed, members first.
    pub fn remove_unclaimed(&mut self) -> ManagerResult<usize> {
        let members = self.members.unclaimed_keys();
        for key in &members {
            self.members.remove(key)?;
        }
        let groups = self.groups.unclaimed_keys();
        for key in &groups {
            self.groups.remove(key)?;
        }
        Ok(members.len() + groups.len())
    }

    pub fn groups(&self) -> &ObjectStore<NextHopGroupTraits> {
        &self.groups
    }

    pub fn members(&self) -> &ObjectStore<NextHopGroupMemberTraits> {
        &self.members
    }
}
