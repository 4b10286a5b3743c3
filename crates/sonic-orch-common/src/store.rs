//! Generic per-family object store.
//!
//! An [`ObjectStore`] owns every hardware object of one family, keyed by the
//! host's identity for the object. It is the only path to the adapter for
//! that family: objects are created on first `set_object`, reconciled by
//! attribute diff afterwards, and removed explicitly. Reads never touch the
//! adapter.

use log::{debug, info};
use sonic_sai::{
    AdapterKey, AttrId, AttrValue, AttributeSet, ObjectSchema, ObjectType, RawSaiObjectId,
    SaiApi, SaiError, SaiObjectId, SaiObjectKind, SaiResult,
};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Per-family behavior plugged into [`ObjectStore`].
///
/// Implemented on a marker type per family. The host key must be derivable
/// from adapter state alone so that warm-boot reload can rebuild the store.
pub trait ObjectTraits {
    const OBJECT_TYPE: ObjectType;

    /// Handle the adapter issues (or accepts) for an object of this family.
    type AdapterKey: Copy + Ord + fmt::Debug + fmt::Display + Into<AdapterKey>;

    /// Identity of an object as the host sees it.
    type HostKey: Clone + Ord + fmt::Debug;

    fn schema() -> &'static ObjectSchema {
        Self::OBJECT_TYPE.schema()
    }

    fn create(
        api: &dyn SaiApi,
        switch_id: RawSaiObjectId,
        host_key: &Self::HostKey,
        attrs: &AttributeSet,
    ) -> SaiResult<Self::AdapterKey>;

    /// Narrows a generic adapter key to this family's key type.
    fn adapter_key_from(key: &AdapterKey) -> Option<Self::AdapterKey>;

    /// Rebuilds the host key of a live object from what the adapter reports.
    fn host_key(
        api: &dyn SaiApi,
        adapter_key: &Self::AdapterKey,
        attrs: &AttributeSet,
    ) -> SaiResult<Self::HostKey>;
}

/// Creates an id-addressed object and wraps the returned id.
pub fn create_oid_object<K: SaiObjectKind>(
    api: &dyn SaiApi,
    switch_id: RawSaiObjectId,
    attrs: &AttributeSet,
) -> SaiResult<SaiObjectId<K>> {
    let raw = api.create_object(K::OBJECT_TYPE, switch_id, attrs)?;
    SaiObjectId::from_raw(raw).ok_or_else(|| {
        SaiError::internal(format!("adapter returned a null id for new {}", K::OBJECT_TYPE))
    })
}

/// A tracked hardware object.
pub struct SaiObject<T: ObjectTraits> {
    adapter_key: T::AdapterKey,
    attributes: AttributeSet,
}

impl<T: ObjectTraits> SaiObject<T> {
    pub fn adapter_key(&self) -> T::AdapterKey {
        self.adapter_key
    }

    /// Attributes as last written to (or read from) the adapter.
    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn attribute(&self, id: AttrId) -> Option<&AttrValue> {
        self.attributes.get(id)
    }
}

impl<T: ObjectTraits> fmt::Debug for SaiObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaiObject")
            .field("adapter_key", &self.adapter_key)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Adapter traffic generated by a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub created: u64,
    pub attributes_set: u64,
    pub removed: u64,
    pub reloaded: u64,
}

pub struct ObjectStore<T: ObjectTraits> {
    api: Arc<dyn SaiApi>,
    switch_id: RawSaiObjectId,
    objects: BTreeMap<T::HostKey, SaiObject<T>>,
    /// Reloaded objects nobody has asked for since the restart.
    unclaimed: BTreeSet<T::HostKey>,
    stats: StoreStats,
}

impl<T: ObjectTraits> ObjectStore<T> {
    pub fn new(api: Arc<dyn SaiApi>, switch_id: RawSaiObjectId) -> Self {
        Self {
            api,
            switch_id,
            objects: BTreeMap::new(),
            unclaimed: BTreeSet::new(),
            stats: StoreStats::default(),
        }
    }

    pub fn api(&self) -> &Arc<dyn SaiApi> {
        &self.api
    }

    pub fn switch_id(&self) -> RawSaiObjectId {
        self.switch_id
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn get(&self, host_key: &T::HostKey) -> Option<&SaiObject<T>> {
        self.objects.get(host_key)
    }

    pub fn adapter_key(&self, host_key: &T::HostKey) -> Option<T::AdapterKey> {
        self.objects.get(host_key).map(SaiObject::adapter_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T::HostKey, &SaiObject<T>)> {
        self.objects.iter()
    }

    /// Host key of the object with the given adapter key, if tracked.
    pub fn find_by_adapter_key(&self, adapter_key: &T::AdapterKey) -> Option<&T::HostKey> {
        self.objects
            .iter()
            .find(|(_, object)| object.adapter_key == *adapter_key)
            .map(|(host_key, _)| host_key)
    }

    /// Makes the object at `host_key` carry exactly `attrs`.
    ///
    /// Creates the object if it is not tracked; otherwise writes only the
    /// attributes that differ. Setting an identical attribute set issues no
    /// adapter call. A reloaded object is claimed by this call.
    pub fn set_object(
        &mut self,
        host_key: T::HostKey,
        attrs: AttributeSet,
    ) -> SaiResult<&SaiObject<T>> {
        let schema = T::schema();
        self.unclaimed.remove(&host_key);

        match self.objects.entry(host_key) {
            Entry::Occupied(slot) => {
                let object = slot.into_mut();
                let writes = schema.diff(&object.attributes, &attrs)?;
                let key: AdapterKey = object.adapter_key.into();
                for (id, value) in writes {
                    self.api.set_attribute(&key, id, &value)?;
                    self.stats.attributes_set += 1;
                    debug!(
                        "Set {}.{} = {:?} on {}",
                        T::OBJECT_TYPE,
                        schema.attr_name(id),
                        value,
                        key
                    );
                    object.attributes.set(id, value);
                }
                object.attributes = attrs;
                Ok(&*object)
            }
            Entry::Vacant(slot) => {
                schema.validate_create(&attrs)?;
                let adapter_key = T::create(self.api.as_ref(), self.switch_id, slot.key(), &attrs)?;
                self.stats.created += 1;
                debug!("Created {} {:?} as {}", T::OBJECT_TYPE, slot.key(), adapter_key);
                Ok(&*slot.insert(SaiObject {
                    adapter_key,
                    attributes: attrs,
                }))
            }
        }
    }

    /// Writes one attribute of a tracked object. Returns whether the adapter
    /// was called.
    pub fn set_attribute(
        &mut self,
        host_key: &T::HostKey,
        id: AttrId,
        value: AttrValue,
    ) -> SaiResult<bool> {
        let schema = T::schema();
        schema.validate_set(id, &value)?;
        let object = self
            .objects
            .get_mut(host_key)
            .ok_or_else(|| SaiError::not_found(format!("{} {:?}", T::OBJECT_TYPE, host_key)))?;
        if schema.effective_value(&object.attributes, id).as_ref() == Some(&value) {
            return Ok(false);
        }

        let key: AdapterKey = object.adapter_key.into();
        self.api.set_attribute(&key, id, &value)?;
        self.stats.attributes_set += 1;
        debug!(
            "Set {}.{} = {:?} on {}",
            T::OBJECT_TYPE,
            schema.attr_name(id),
            value,
            key
        );
        object.attributes.set(id, value);
        Ok(true)
    }

    /// Removes the object from the adapter, then stops tracking it. An
    /// adapter failure leaves the object tracked.
    pub fn remove(&mut self, host_key: &T::HostKey) -> SaiResult<()> {
        let object = self
            .objects
            .get(host_key)
            .ok_or_else(|| SaiError::not_found(format!("{} {:?}", T::OBJECT_TYPE, host_key)))?;
        let key: AdapterKey = object.adapter_key.into();
        self.api.remove(&key)?;

        self.objects.remove(host_key);
        self.unclaimed.remove(host_key);
        self.stats.removed += 1;
        debug!("Removed {} {:?} ({})", T::OBJECT_TYPE, host_key, key);
        Ok(())
    }

    /// Rebuilds the store from objects already live in the adapter.
    ///
    /// Every reloaded object starts unclaimed. Returns the number reloaded.
    pub fn reload(&mut self) -> SaiResult<usize> {
        if !self.objects.is_empty() {
            return Err(SaiError::internal(format!(
                "reload of {} into a non-empty store",
                T::OBJECT_TYPE
            )));
        }

        let schema = T::schema();
        let api = self.api.as_ref();
        let keys = api.get_object_keys(T::OBJECT_TYPE)?;
        for key in &keys {
            let adapter_key = T::adapter_key_from(key).ok_or_else(|| {
                SaiError::internal(format!("{} listed as {}", key, T::OBJECT_TYPE))
            })?;

            let mut attrs = AttributeSet::new();
            for spec in schema.attrs.iter().filter(|spec| !spec.usage.is_read_only()) {
                match api.get_attribute(key, spec.id) {
                    Ok(value) => {
                        attrs.set(spec.id, value);
                    }
                    Err(SaiError::NotFound { .. }) => {}
                    Err(e) => return Err(e),
                }
            }

            let host_key = T::host_key(api, &adapter_key, &attrs)?;
            if self.objects.contains_key(&host_key) {
                return Err(SaiError::already_exists(format!(
                    "{} {:?} reloaded twice",
                    T::OBJECT_TYPE,
                    host_key
                )));
            }
            self.unclaimed.insert(host_key.clone());
            self.objects.insert(
                host_key,
                SaiObject {
                    adapter_key,
                    attributes: attrs,
                },
            );
        }

        self.stats.reloaded += keys.len() as u64;
        info!("Reloaded {} {} objects", keys.len(), T::OBJECT_TYPE);
        Ok(keys.len())
    }

    /// Marks a reloaded object as still wanted without rewriting it.
    pub fn claim(&mut self, host_key: &T::HostKey) -> bool {
        self.unclaimed.remove(host_key)
    }

    /// Reloaded objects nothing has claimed yet, in key order.
    pub fn unclaimed_keys(&self) -> Vec<T::HostKey> {
        self.unclaimed.iter().cloned().collect()
    }
}

impl<T: ObjectTraits> fmt::Debug for ObjectStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStore")
            .field("object_type", &T::OBJECT_TYPE)
            .field("switch_id", &format_args!("0x{:x}", self.switch_id))
            .field("objects", &self.objects.len())
            .field("unclaimed", &self.unclaimed.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sonic_sai::schema::{port, switch, vlan, vlan_member};
    use sonic_sai::{FakeSai, PortKind, PortOid, SaiCall, VlanKind, VlanOid};
    use sonic_types::VlanId;

    /// Ports keyed by their first hardware lane.
    struct TestPort;

    impl ObjectTraits for TestPort {
        const OBJECT_TYPE: ObjectType = ObjectType::Port;
        type AdapterKey = PortOid;
        type HostKey = u32;

        fn create(
            api: &dyn SaiApi,
            switch_id: RawSaiObjectId,
            _host_key: &u32,
            attrs: &AttributeSet,
        ) -> SaiResult<PortOid> {
            create_oid_object::<PortKind>(api, switch_id, attrs)
        }

        fn adapter_key_from(key: &AdapterKey) -> Option<PortOid> {
            PortOid::from_adapter_key(key)
        }

        fn host_key(_api: &dyn SaiApi, _key: &PortOid, attrs: &AttributeSet) -> SaiResult<u32> {
            attrs
                .get(port::HW_LANE_LIST)
                .and_then(AttrValue::as_u32_list)
                .and_then(|lanes| lanes.first().copied())
                .ok_or_else(|| SaiError::internal("port without lanes"))
        }
    }

    struct TestVlan;

    impl ObjectTraits for TestVlan {
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

        fn host_key(_api: &dyn SaiApi, _key: &VlanOid, attrs: &AttributeSet) -> SaiResult<VlanId> {
            attrs
                .get(vlan::VLAN_ID)
                .and_then(AttrValue::as_u16)
                .and_then(|id| VlanId::new(id).ok())
                .ok_or_else(|| SaiError::internal("vlan without id"))
        }
    }

    fn setup() -> (Arc<FakeSai>, RawSaiObjectId) {
        let fake = Arc::new(FakeSai::new());
        let switch_id = fake
            .create_object(
                ObjectType::Switch,
                0,
                &AttributeSet::new().with(switch::INIT_SWITCH, AttrValue::Bool(true)),
            )
            .unwrap();
        fake.clear_calls();
        (fake, switch_id)
    }

    fn port_attrs(lane: u32, speed: u32) -> AttributeSet {
        AttributeSet::new()
            .with(port::HW_LANE_LIST, AttrValue::U32List(vec![lane]))
            .with(port::SPEED, AttrValue::U32(speed))
    }

    #[test]
    fn test_create_then_identical_set_is_silent() {
        let (fake, switch_id) = setup();
        let mut store: ObjectStore<TestPort> = ObjectStore::new(fake.clone(), switch_id);

        let oid = store.set_object(0, port_attrs(0, 25_000)).unwrap().adapter_key();
        assert_eq!(fake.calls().len(), 1);
        assert!(fake.calls()[0].is_create());

        let again = store.set_object(0, port_attrs(0, 25_000)).unwrap().adapter_key();
        assert_eq!(again, oid);
        assert_eq!(fake.calls().len(), 1);
        assert_eq!(store.stats().created, 1);
        assert_eq!(store.stats().attributes_set, 0);
    }

    #[test]
    fn test_diff_writes_only_changed_attributes() {
        let (fake, switch_id) = setup();
        let mut store: ObjectStore<TestPort> = ObjectStore::new(fake.clone(), switch_id);
        store.set_object(0, port_attrs(0, 25_000)).unwrap();
        fake.clear_calls();

        let desired = port_attrs(0, 10_000).with(port::ADMIN_STATE, AttrValue::Bool(false));
        store.set_object(0, desired).unwrap();

        // ADMIN_STATE false equals its default, so only SPEED moves.
        let calls = fake.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            SaiCall::SetAttribute { id, value, .. } => {
                assert_eq!(*id, port::SPEED);
                assert_eq!(*value, AttrValue::U32(10_000));
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn test_unset_attribute_restores_default() {
        let (fake, switch_id) = setup();
        let mut store: ObjectStore<TestPort> = ObjectStore::new(fake.clone(), switch_id);
        store
            .set_object(0, port_attrs(0, 25_000).with(port::ADMIN_STATE, AttrValue::Bool(true)))
            .unwrap();
        fake.clear_calls();

        store.set_object(0, port_attrs(0, 25_000)).unwrap();

        let key: AdapterKey = store.adapter_key(&0).unwrap().into();
        assert_eq!(
            fake.calls(),
            vec![SaiCall::SetAttribute {
                key,
                id: port::ADMIN_STATE,
                value: AttrValue::Bool(false),
            }]
        );
        assert!(store.get(&0).unwrap().attribute(port::ADMIN_STATE).is_none());
    }

    #[test]
    fn test_create_only_change_rejected_before_adapter() {
        let (fake, switch_id) = setup();
        let mut store: ObjectStore<TestPort> = ObjectStore::new(fake.clone(), switch_id);
        store.set_object(0, port_attrs(0, 25_000)).unwrap();
        fake.clear_calls();

        let err = store.set_object(0, port_attrs(1, 25_000)).unwrap_err();
        assert!(matches!(err, SaiError::InvalidParameter { .. }));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_set_attribute_skips_unchanged() {
        let (fake, switch_id) = setup();
        let mut store: ObjectStore<TestPort> = ObjectStore::new(fake.clone(), switch_id);
        store.set_object(0, port_attrs(0, 25_000)).unwrap();
        fake.clear_calls();

        assert!(!store.set_attribute(&0, port::LINK_SCAN_ENABLE, AttrValue::Bool(true)).unwrap());
        assert!(store.set_attribute(&0, port::LINK_SCAN_ENABLE, AttrValue::Bool(false)).unwrap());
        assert_eq!(fake.calls().len(), 1);
        assert!(store.set_attribute(&7, port::SPEED, AttrValue::U32(1)).is_err());
    }

    #[test]
    fn test_reads_never_reach_adapter() {
        let (fake, switch_id) = setup();
        let mut store: ObjectStore<TestPort> = ObjectStore::new(fake.clone(), switch_id);
        store.set_object(0, port_attrs(0, 25_000)).unwrap();
        fake.clear_calls();

        assert!(store.get(&0).is_some());
        assert!(store.get(&1).is_none());
        assert_eq!(store.iter().count(), 1);
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_remove_in_use_keeps_tracking() {
        let (fake, switch_id) = setup();
        let mut ports: ObjectStore<TestPort> = ObjectStore::new(fake.clone(), switch_id);
        let mut vlans: ObjectStore<TestVlan> = ObjectStore::new(fake.clone(), switch_id);
        let port_oid = ports.set_object(0, port_attrs(0, 25_000)).unwrap().adapter_key();
        let vlan_id = VlanId::new(10).unwrap();
        let vlan_oid = vlans
            .set_object(vlan_id, AttributeSet::new().with(vlan::VLAN_ID, AttrValue::U16(10)))
            .unwrap()
            .adapter_key();
        fake.create_object(
            ObjectType::VlanMember,
            switch_id,
            &AttributeSet::new()
                .with(vlan_member::VLAN_ID, AttrValue::Oid(vlan_oid.as_raw()))
                .with(vlan_member::PORT_ID, AttrValue::Oid(port_oid.as_raw())),
        )
        .unwrap();

        let err = vlans.remove(&vlan_id).unwrap_err();
        assert!(matches!(err, SaiError::ObjectInUse { .. }));
        assert_eq!(vlans.adapter_key(&vlan_id), Some(vlan_oid));
        assert!(matches!(
            vlans.remove(&VlanId::new(20).unwrap()),
            Err(SaiError::NotFound { .. })
        ));
    }

    #[test]
    fn test_reload_recovers_keys_without_calls() {
        let (fake, switch_id) = setup();
        let mut before: ObjectStore<TestPort> = ObjectStore::new(fake.clone(), switch_id);
        let oid0 = before.set_object(0, port_attrs(0, 25_000)).unwrap().adapter_key();
        let oid4 = before
            .set_object(4, port_attrs(4, 10_000).with(port::ADMIN_STATE, AttrValue::Bool(true)))
            .unwrap()
            .adapter_key();
        fake.clear_calls();

        let mut after: ObjectStore<TestPort> = ObjectStore::new(fake.clone(), switch_id);
        assert_eq!(after.reload().unwrap(), 2);
        assert_eq!(after.adapter_key(&0), Some(oid0));
        assert_eq!(after.adapter_key(&4), Some(oid4));
        assert_eq!(after.find_by_adapter_key(&oid4), Some(&4));
        assert_eq!(after.unclaimed_keys(), vec![0, 4]);

        after
            .set_object(4, port_attrs(4, 10_000).with(port::ADMIN_STATE, AttrValue::Bool(true)))
            .unwrap();
        assert_eq!(after.unclaimed_keys(), vec![0]);
        assert!(after.claim(&0));
        assert!(after.unclaimed_keys().is_empty());
        assert!(fake.calls().iter().all(|call| !call.is_create() && !call.is_set()));
        assert_eq!(after.stats().reloaded, 2);
    }

    #[test]
    fn test_reload_into_populated_store_fails() {
        let (fake, switch_id) = setup();
        let mut store: ObjectStore<TestVlan> = ObjectStore::new(fake, switch_id);
        store
            .set_object(
                VlanId::new(5).unwrap(),
                AttributeSet::new().with(vlan::VLAN_ID, AttrValue::U16(5)),
            )
            .unwrap();
        assert!(store.reload().is_err());
    }
}
