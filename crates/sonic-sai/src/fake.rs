//! In-memory adapter.
//!
//! [`FakeSai`] behaves like a well-mannered vendor driver: it validates
//! creation requests against the family schema, serves documented defaults
//! for unset attributes, computes read-only list attributes, and refuses to
//! remove an object that another object still references. Every mutating
//! call is recorded in order so tests can assert on hardware traffic.
//!
//! The object table can be saved to and loaded from a JSON snapshot, which
//! lets a simulated warm boot span process restarts.

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::api::SaiApi;
use crate::attribute::{AttrId, AttrValue, AttributeSet};
use crate::error::{SaiError, SaiOp, SaiResult, SaiStatus};
use crate::schema::{next_hop_group, next_hop_group_member, port, switch, vlan, vlan_member};
use crate::types::{AdapterKey, ObjectType, RawSaiObjectId, RouteEntry};

/// A mutating adapter call, as recorded by [`FakeSai`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaiCall {
    Create { key: AdapterKey, attrs: AttributeSet },
    Remove { key: AdapterKey },
    SetAttribute { key: AdapterKey, id: AttrId, value: AttrValue },
}

impl SaiCall {
    pub fn key(&self) -> &AdapterKey {
        match self {
            SaiCall::Create { key, .. }
            | SaiCall::Remove { key }
            | SaiCall::SetAttribute { key, .. } => key,
        }
    }

    pub fn is_create(&self) -> bool {
        matches!(self, SaiCall::Create { .. })
    }

    pub fn is_set(&self) -> bool {
        matches!(self, SaiCall::SetAttribute { .. })
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct FakeSnapshot {
    next_oid: u64,
    objects: Vec<(AdapterKey, AttributeSet)>,
}

#[derive(Debug, Default)]
struct FakeDb {
    next_oid: u64,
    objects: BTreeMap<AdapterKey, AttributeSet>,
}

impl FakeDb {
    fn allocate_oid(&mut self, object_type: ObjectType) -> RawSaiObjectId {
        self.next_oid += 1;
        let type_bits = ObjectType::ALL
            .iter()
            .position(|t| *t == object_type)
            .unwrap_or_default() as u64
            + 1;
        (type_bits << 48) | self.next_oid
    }

    fn find_oid(&self, oid: RawSaiObjectId) -> Option<&AdapterKey> {
        self.objects.keys().find(|key| key.oid() == Some(oid))
    }

    fn check_references(&self, attrs: &AttributeSet) -> SaiResult<()> {
        for (id, value) in attrs.iter() {
            for oid in value.referenced_oids() {
                if self.find_oid(oid).is_none() {
                    return Err(SaiError::invalid_parameter(format!(
                        "{} references unknown object 0x{:x}",
                        id, oid
                    )));
                }
            }
        }
        Ok(())
    }

    fn referrers(&self, oid: RawSaiObjectId) -> impl Iterator<Item = &AdapterKey> + '_ {
        self.objects.iter().filter_map(move |(key, attrs)| {
            attrs
                .iter()
                .any(|(_, value)| value.referenced_oids().contains(&oid))
                .then_some(key)
        })
    }

    fn members_of(
        &self,
        member_type: ObjectType,
        parent_attr: AttrId,
        parent: RawSaiObjectId,
    ) -> Vec<RawSaiObjectId> {
        self.objects
            .iter()
            .filter(|(key, attrs)| {
                key.object_type() == member_type
                    && attrs.get(parent_attr).and_then(AttrValue::as_oid) == Some(parent)
            })
            .filter_map(|(key, _)| key.oid())
            .collect()
    }

    fn duplicate_of(&self, object_type: ObjectType, attrs: &AttributeSet) -> Option<&AdapterKey> {
        let unique_attr = match object_type {
            ObjectType::Port => port::HW_LANE_LIST,
            ObjectType::Vlan => vlan::VLAN_ID,
            _ => return None,
        };
        let wanted = attrs.get(unique_attr)?;
        self.objects.iter().find_map(|(key, existing)| {
            (key.object_type() == object_type && existing.get(unique_attr) == Some(wanted))
                .then_some(key)
        })
    }
}

/// In-memory adapter for tests and simulation.
#[derive(Debug, Default)]
pub struct FakeSai {
    db: Mutex<FakeDb>,
    calls: Mutex<Vec<SaiCall>>,
    injected_failure: Mutex<Option<(ObjectType, SaiStatus)>>,
}

impl FakeSai {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every mutating call since creation or the last [`clear_calls`](Self::clear_calls).
    pub fn calls(&self) -> Vec<SaiCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Number of live objects of a family, without going through the API.
    pub fn count(&self, object_type: ObjectType) -> usize {
        self.db
            .lock()
            .objects
            .keys()
            .filter(|key| key.object_type() == object_type)
            .count()
    }

    /// Stored attributes of a live object.
    pub fn attributes(&self, key: &AdapterKey) -> Option<AttributeSet> {
        self.db.lock().objects.get(key).cloned()
    }

    /// Makes the next mutating call on `object_type` fail with `status`.
    pub fn fail_next_call(&self, object_type: ObjectType, status: SaiStatus) {
        *self.injected_failure.lock() = Some((object_type, status));
    }

    fn check_injected(&self, op: SaiOp, object_type: ObjectType) -> SaiResult<()> {
        let mut injected = self.injected_failure.lock();
        match *injected {
            Some((target, status)) if target == object_type => {
                *injected = None;
                Err(SaiError::Status { op, status })
            }
            _ => Ok(()),
        }
    }

    fn record(&self, call: SaiCall) {
        debug!("fake adapter: {:?}", call);
        self.calls.lock().push(call);
    }

    /// Writes the object table to `path` as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let snapshot = {
            let db = self.db.lock();
            FakeSnapshot {
                next_oid: db.next_oid,
                objects: db
                    .objects
                    .iter()
                    .map(|(key, attrs)| (*key, attrs.clone()))
                    .collect(),
            }
        };
        let json = serde_json::to_string_pretty(&snapshot).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Loads an object table written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let snapshot: FakeSnapshot = serde_json::from_str(&json).map_err(std::io::Error::other)?;
        let fake = FakeSai::new();
        {
            let mut db = fake.db.lock();
            db.next_oid = snapshot.next_oid;
            db.objects = snapshot.objects.into_iter().collect();
        }
        Ok(fake)
    }
}

impl SaiApi for FakeSai {
    fn create_object(
        &self,
        object_type: ObjectType,
        switch_id: RawSaiObjectId,
        attrs: &AttributeSet,
    ) -> SaiResult<RawSaiObjectId> {
        let op = SaiOp::Create(object_type);
        self.check_injected(op, object_type)?;
        if object_type.is_entry() {
            return Err(SaiError::invalid_parameter(format!(
                "{} is an entry object",
                object_type
            )));
        }
        object_type.schema().validate_create(attrs)?;

        let mut db = self.db.lock();
        if object_type != ObjectType::Switch && db.find_oid(switch_id).is_none() {
            return Err(SaiError::Status {
                op,
                status: SaiStatus::InvalidObjectId,
            });
        }
        db.check_references(attrs)?;
        if let Some(existing) = db.duplicate_of(object_type, attrs) {
            return Err(SaiError::already_exists(existing.to_string()));
        }

        let oid = db.allocate_oid(object_type);
        let key = AdapterKey::Object { object_type, oid };
        db.objects.insert(key, attrs.clone());
        drop(db);

        self.record(SaiCall::Create {
            key,
            attrs: attrs.clone(),
        });
        Ok(oid)
    }

    fn create_route(&self, entry: &RouteEntry, attrs: &AttributeSet) -> SaiResult<()> {
        self.check_injected(SaiOp::Create(ObjectType::Route), ObjectType::Route)?;
        ObjectType::Route.schema().validate_create(attrs)?;

        let key = AdapterKey::Route(*entry);
        let mut db = self.db.lock();
        if db.objects.contains_key(&key) {
            return Err(SaiError::already_exists(key.to_string()));
        }
        if db.find_oid(entry.virtual_router_id).is_none() {
            return Err(SaiError::invalid_parameter(format!(
                "unknown virtual router 0x{:x}",
                entry.virtual_router_id
            )));
        }
        db.check_references(attrs)?;
        db.objects.insert(key, attrs.clone());
        drop(db);

        self.record(SaiCall::Create {
            key,
            attrs: attrs.clone(),
        });
        Ok(())
    }

    fn remove(&self, key: &AdapterKey) -> SaiResult<()> {
        self.check_injected(SaiOp::Remove(key.object_type()), key.object_type())?;

        let mut db = self.db.lock();
        if !db.objects.contains_key(key) {
            return Err(SaiError::not_found(key.to_string()));
        }
        if let Some(oid) = key.oid() {
            if let Some(referrer) = db.referrers(oid).find(|referrer| *referrer != key) {
                return Err(SaiError::object_in_use(format!(
                    "{} is referenced by {}",
                    key, referrer
                )));
            }
        }
        db.objects.remove(key);
        drop(db);

        self.record(SaiCall::Remove { key: *key });
        Ok(())
    }

    fn get_attribute(&self, key: &AdapterKey, id: AttrId) -> SaiResult<AttrValue> {
        let object_type = key.object_type();
        let schema = object_type.schema();
        let db = self.db.lock();
        let attrs = db
            .objects
            .get(key)
            .ok_or_else(|| SaiError::not_found(key.to_string()))?;

        let computed = match (object_type, id) {
            (ObjectType::Switch, switch::PORT_NUMBER) => {
                let ports = db
                    .objects
                    .keys()
                    .filter(|k| k.object_type() == ObjectType::Port)
                    .count();
                Some(AttrValue::U32(u32::try_from(ports).unwrap_or(u32::MAX)))
            }
            (ObjectType::Port, port::OPER_STATUS) => {
                let up = attrs.get(port::ADMIN_STATE).and_then(AttrValue::as_bool) == Some(true);
                Some(AttrValue::S32(if up { 1 } else { 2 }))
            }
            (ObjectType::Vlan, vlan::MEMBER_LIST) => key.oid().map(|oid| {
                AttrValue::OidList(db.members_of(ObjectType::VlanMember, vlan_member::VLAN_ID, oid))
            }),
            (ObjectType::NextHopGroup, next_hop_group::MEMBER_LIST) => key.oid().map(|oid| {
                AttrValue::OidList(db.members_of(
                    ObjectType::NextHopGroupMember,
                    next_hop_group_member::NEXT_HOP_GROUP_ID,
                    oid,
                ))
            }),
            _ => None,
        };
        if let Some(value) = computed {
            return Ok(value);
        }

        schema.effective_value(attrs, id).ok_or_else(|| {
            SaiError::not_found(format!("{}.{} on {}", object_type, schema.attr_name(id), key))
        })
    }

    fn set_attribute(&self, key: &AdapterKey, id: AttrId, value: &AttrValue) -> SaiResult<()> {
        let object_type = key.object_type();
        self.check_injected(SaiOp::SetAttribute(object_type), object_type)?;
        object_type.schema().validate_set(id, value)?;

        let mut db = self.db.lock();
        if !db.objects.contains_key(key) {
            return Err(SaiError::not_found(key.to_string()));
        }
        db.check_references(&AttributeSet::new().with(id, value.clone()))?;
        if let Some(attrs) = db.objects.get_mut(key) {
            attrs.set(id, value.clone());
        }
        drop(db);

        self.record(SaiCall::SetAttribute {
            key: *key,
            id,
            value: value.clone(),
        });
        Ok(())
    }

    fn get_object_count(&self, object_type: ObjectType) -> SaiResult<u32> {
        u32::try_from(self.count(object_type)).map_err(|_| SaiError::Status {
            op: SaiOp::GetObjectCount(object_type),
            status: SaiStatus::Failure,
        })
    }

    fn get_object_keys(&self, object_type: ObjectType) -> SaiResult<Vec<AdapterKey>> {
        Ok(self
            .db
            .lock()
            .objects
            .keys()
            .filter(|key| key.object_type() == object_type)
            .copied()
            .collect())
    }
}
