use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::error::{ManagerError, ManagerResult};
use log::info;
use sonic_orch_common::{create_oid_object, ObjectStore, ObjectTraits};
use sonic_sai::{
    AdapterKey, AttributeSet, ObjectType, RawSaiObjectId, SaiApi, SaiResult, VirtualRouterKind,
    VirtualRouterOid,
};
use sonic_types::RouterId;
use std::sync::Arc;

pub struct VirtualRouterTraits;

impl ObjectTraits for VirtualRouterTraits {
    const OBJECT_TYPE: ObjectType = ObjectType::VirtualRouter;
    type AdapterKey = VirtualRouterOid;
    type HostKey = ();

    fn create(
        api: &dyn SaiApi,
        switch_id: RawSaiObjectId,
        _host_key: &(),
        attrs: &AttributeSet,
    ) -> SaiResult<VirtualRouterOid> {
        create_oid_object::<VirtualRouterKind>(api, switch_id, attrs)
    }

    fn adapter_key_from(key: &AdapterKey) -> Option<VirtualRouterOid> {
        VirtualRouterOid::from_adapter_key(key)
    }

    fn host_key(
        _api: &dyn SaiApi,
        _key: &VirtualRouterOid,
        _attrs: &AttributeSet,
    ) -> SaiResult<()> {
        Ok(())
    }
}

pub struct VirtualRouterManager {
    store: ObjectStore<VirtualRouterTraits>,
}

impl VirtualRouterManager {
    pub fn new(api: Arc<dyn SaiApi>, switch_id: RawSaiObjectId) -> Self {
        Self {
            store: ObjectStore::new(api, switch_id),
        }
    }

    pub fn reload(&mut self) -> ManagerResult<usize> {
        Ok(self.store.reload()?)
    }

    /// Returns the router's handle, creating the default router on first use.
    ///
    /// Any router other than the default fails with `Unsupported`; the
    /// hardware has a single routing table.
    pub fn add_virtual_router(&mut self, router: RouterId) -> ManagerResult<VirtualRouterOid> {
        if router != RouterId::DEFAULT {
            let err = ManagerError::Unsupported(format!(
                "{}: only the default virtual router is supported",
                router
            ));
            audit_log!(
                AuditRecord::new(AuditCategory::ResourceCreate, "VirtualRouterManager", "add")
                    .with_object_id(router.to_string())
                    .with_object_type("virtual_router")
                    .with_error(err.to_string())
                    .with_outcome(AuditOutcome::Denied)
            );
            return Err(err);
        }

        if let Some(oid) = self.store.adapter_key(&()) {
            self.store.claim(&());
            return Ok(oid);
        }
        let oid = self.store.set_object((), AttributeSet::new())?.adapter_key();
        info!("Created default virtual router {}", oid);
        Ok(oid)
    }

    pub fn get_virtual_router(&self, router: RouterId) -> Option<VirtualRouterOid> {
        if router != RouterId::DEFAULT {
            return None;
        }
        self.store.adapter_key(&())
    }

    pub fn store(&self) -> &ObjectStore<VirtualRouterTraits> {
        &self.store
    }
}
