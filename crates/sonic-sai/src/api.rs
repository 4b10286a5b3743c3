//! The hardware adapter API.
//!
//! [`SaiApi`] is the narrow, vendor-neutral surface every object store talks
//! to. Calls are synchronous; an implementation serializes access to its own
//! state and callers never interleave mutations of the same family.

use crate::attribute::{AttrId, AttrValue, AttributeSet};
use crate::error::SaiResult;
use crate::types::{AdapterKey, ObjectType, RawSaiObjectId, RouteEntry};

/// Hardware adapter operations, per object family.
pub trait SaiApi: Send + Sync {
    /// Creates an id-addressed object and returns its adapter-issued id.
    ///
    /// `switch_id` is ignored when creating the switch itself.
    fn create_object(
        &self,
        object_type: ObjectType,
        switch_id: RawSaiObjectId,
        attrs: &AttributeSet,
    ) -> SaiResult<RawSaiObjectId>;

    /// Creates a route entry; the entry is its own adapter key.
    fn create_route(&self, entry: &RouteEntry, attrs: &AttributeSet) -> SaiResult<()>;

    /// Removes an object. Fails with `ObjectInUse` while other objects still
    /// reference it.
    fn remove(&self, key: &AdapterKey) -> SaiResult<()>;

    fn get_attribute(&self, key: &AdapterKey, id: AttrId) -> SaiResult<AttrValue>;

    fn set_attribute(&self, key: &AdapterKey, id: AttrId, value: &AttrValue) -> SaiResult<()>;

    /// Number of live objects of a family. Used during warm-boot reload.
    fn get_object_count(&self, object_type: ObjectType) -> SaiResult<u32>;

    /// Keys of every live object of a family. Used during warm-boot reload.
    fn get_object_keys(&self, object_type: ObjectType) -> SaiResult<Vec<AdapterKey>>;
}
