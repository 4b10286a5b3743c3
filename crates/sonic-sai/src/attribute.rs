//! Attribute model.
//!
//! Attribute values are a tagged variant keyed by [`AttrId`]. Each object
//! family declares an [`ObjectSchema`]: the id, value kind, usage and
//! documented default of every attribute it accepts. Creation requests are
//! validated against the schema and attribute updates are computed as a
//! schema-aware diff.
//!
//! An absent optional attribute means "the documented default". Diffing an
//! attribute set that drops an optional attribute therefore writes the
//! default back to hardware.

use serde::{Deserialize, Serialize};
use sonic_types::{IpAddress, MacAddress};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{SaiError, SaiResult};
use crate::types::{ObjectType, RawSaiObjectId, NULL_OBJECT_ID};

/// Attribute id, scoped to an object family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrId(pub u32);

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attr#{}", self.0)
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttrValue {
    Bool(bool),
    U16(u16),
    U32(u32),
    S32(i32),
    U32List(Vec<u32>),
    S8List(Vec<i8>),
    Oid(RawSaiObjectId),
    OidList(Vec<RawSaiObjectId>),
    Mac(MacAddress),
    Ip(IpAddress),
}

/// Value kind, used by schemas to type-check attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Bool,
    U16,
    U32,
    S32,
    U32List,
    S8List,
    Oid,
    OidList,
    Mac,
    Ip,
}

impl AttrValue {
    pub fn kind(&self) -> AttrKind {
        match self {
            AttrValue::Bool(_) => AttrKind::Bool,
            AttrValue::U16(_) => AttrKind::U16,
            AttrValue::U32(_) => AttrKind::U32,
            AttrValue::S32(_) => AttrKind::S32,
            AttrValue::U32List(_) => AttrKind::U32List,
            AttrValue::S8List(_) => AttrKind::S8List,
            AttrValue::Oid(_) => AttrKind::Oid,
            AttrValue::OidList(_) => AttrKind::OidList,
            AttrValue::Mac(_) => AttrKind::Mac,
            AttrValue::Ip(_) => AttrKind::Ip,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            AttrValue::U16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            AttrValue::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_s32(&self) -> Option<i32> {
        match self {
            AttrValue::S32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32_list(&self) -> Option<&[u32]> {
        match self {
            AttrValue::U32List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_oid(&self) -> Option<RawSaiObjectId> {
        match self {
            AttrValue::Oid(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_oid_list(&self) -> Option<&[RawSaiObjectId]> {
        match self {
            AttrValue::OidList(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_mac(&self) -> Option<MacAddress> {
        match self {
            AttrValue::Mac(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ip(&self) -> Option<IpAddress> {
        match self {
            AttrValue::Ip(v) => Some(*v),
            _ => None,
        }
    }

    /// Object ids this value refers to, ignoring null.
    pub fn referenced_oids(&self) -> Vec<RawSaiObjectId> {
        match self {
            AttrValue::Oid(oid) if *oid != NULL_OBJECT_ID => vec![*oid],
            AttrValue::OidList(oids) => oids
                .iter()
                .copied()
                .filter(|oid| *oid != NULL_OBJECT_ID)
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Documented hardware default of an optional attribute.
///
/// Kept separate from [`AttrValue`] so schemas can be `static`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrDefault {
    Bool(bool),
    U16(u16),
    U32(u32),
    S32(i32),
    NullOid,
    ZeroMac,
    EmptyOidList,
}

impl AttrDefault {
    pub fn to_value(self) -> AttrValue {
        match self {
            AttrDefault::Bool(v) => AttrValue::Bool(v),
            AttrDefault::U16(v) => AttrValue::U16(v),
            AttrDefault::U32(v) => AttrValue::U32(v),
            AttrDefault::S32(v) => AttrValue::S32(v),
            AttrDefault::NullOid => AttrValue::Oid(NULL_OBJECT_ID),
            AttrDefault::ZeroMac => AttrValue::Mac(MacAddress::ZERO),
            AttrDefault::EmptyOidList => AttrValue::OidList(Vec::new()),
        }
    }
}

/// How an attribute may be used, mirroring the adapter's attribute flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrUsage {
    MandatoryCreateOnly,
    MandatoryCreateAndSet,
    CreateOnly,
    CreateAndSet,
    ReadOnly,
}

impl AttrUsage {
    pub const fn is_mandatory(&self) -> bool {
        matches!(
            self,
            AttrUsage::MandatoryCreateOnly | AttrUsage::MandatoryCreateAndSet
        )
    }

    pub const fn is_settable(&self) -> bool {
        matches!(
            self,
            AttrUsage::MandatoryCreateAndSet | AttrUsage::CreateAndSet
        )
    }

    pub const fn is_read_only(&self) -> bool {
        matches!(self, AttrUsage::ReadOnly)
    }
}

/// One row of an object family's attribute table.
#[derive(Debug, Clone, Copy)]
pub struct AttrSpec {
    pub id: AttrId,
    pub name: &'static str,
    pub kind: AttrKind,
    pub usage: AttrUsage,
    pub default: Option<AttrDefault>,
}

/// The attribute table of one object family.
#[derive(Debug)]
pub struct ObjectSchema {
    pub object_type: ObjectType,
    pub attrs: &'static [AttrSpec],
}

impl ObjectSchema {
    pub fn spec(&self, id: AttrId) -> Option<&'static AttrSpec> {
        self.attrs.iter().find(|spec| spec.id == id)
    }

    pub fn attr_name(&self, id: AttrId) -> String {
        self.spec(id)
            .map(|spec| spec.name.to_string())
            .unwrap_or_else(|| id.to_string())
    }

    fn known_spec(&self, id: AttrId, value: &AttrValue) -> SaiResult<&'static AttrSpec> {
        let spec = self.spec(id).ok_or_else(|| {
            SaiError::invalid_parameter(format!("{} has no attribute {}", self.object_type, id))
        })?;
        if spec.kind != value.kind() {
            return Err(SaiError::invalid_parameter(format!(
                "{}.{} expects {:?}, got {:?}",
                self.object_type,
                spec.name,
                spec.kind,
                value.kind()
            )));
        }
        Ok(spec)
    }

    /// Checks a creation request: every attribute known, writable and of the
    /// right kind, and every mandatory attribute present.
    pub fn validate_create(&self, attrs: &AttributeSet) -> SaiResult<()> {
        for (id, value) in attrs.iter() {
            let spec = self.known_spec(*id, value)?;
            if spec.usage.is_read_only() {
                return Err(SaiError::invalid_parameter(format!(
                    "{}.{} is read-only",
                    self.object_type, spec.name
                )));
            }
        }
        for spec in self.attrs.iter().filter(|spec| spec.usage.is_mandatory()) {
            if !attrs.contains(spec.id) {
                return Err(SaiError::MandatoryAttributeMissing {
                    object_type: self.object_type,
                    attribute: spec.name,
                });
            }
        }
        Ok(())
    }

    /// Checks a single attribute write against the schema.
    pub fn validate_set(&self, id: AttrId, value: &AttrValue) -> SaiResult<()> {
        let spec = self.known_spec(id, value)?;
        if !spec.usage.is_settable() {
            return Err(SaiError::invalid_parameter(format!(
                "{}.{} cannot be set after creation",
                self.object_type, spec.name
            )));
        }
        Ok(())
    }

    /// Value of `id` in `attrs`, falling back to the documented default.
    pub fn effective_value(&self, attrs: &AttributeSet, id: AttrId) -> Option<AttrValue> {
        attrs
            .get(id)
            .cloned()
            .or_else(|| self.spec(id).and_then(|spec| spec.default.map(AttrDefault::to_value)))
    }

    /// Attribute writes that turn `current` into `desired`, in attribute id
    /// order. An optional attribute dropped from `desired` is written back to
    /// its documented default.
    pub fn diff(
        &self,
        current: &AttributeSet,
        desired: &AttributeSet,
    ) -> SaiResult<Vec<(AttrId, AttrValue)>> {
        self.validate_create(desired)?;

        let mut writes = Vec::new();
        for spec in self.attrs.iter().filter(|spec| !spec.usage.is_read_only()) {
            let old = self.effective_value(current, spec.id);
            let new = self.effective_value(desired, spec.id);
            if old == new {
                continue;
            }
            if !spec.usage.is_settable() {
                return Err(SaiError::invalid_parameter(format!(
                    "{}.{} is create-only and cannot change from {:?} to {:?}",
                    self.object_type, spec.name, old, new
                )));
            }
            let value = new.ok_or_else(|| {
                SaiError::invalid_parameter(format!(
                    "{}.{} has no documented default to restore",
                    self.object_type, spec.name
                ))
            })?;
            writes.push((spec.id, value));
        }
        Ok(writes)
    }
}

/// Ordered attribute id to value mapping; absent means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSet {
    attrs: BTreeMap<AttrId, AttrValue>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, id: AttrId, value: AttrValue) -> Self {
        self.attrs.insert(id, value);
        self
    }

    /// Builder-style insert that skips `None`.
    pub fn with_opt(mut self, id: AttrId, value: Option<AttrValue>) -> Self {
        if let Some(value) = value {
            self.attrs.insert(id, value);
        }
        self
    }

    pub fn set(&mut self, id: AttrId, value: AttrValue) -> Option<AttrValue> {
        self.attrs.insert(id, value)
    }

    pub fn unset(&mut self, id: AttrId) -> Option<AttrValue> {
        self.attrs.remove(&id)
    }

    pub fn get(&self, id: AttrId) -> Option<&AttrValue> {
        self.attrs.get(&id)
    }

    pub fn contains(&self, id: AttrId) -> bool {
        self.attrs.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AttrId, &AttrValue)> {
        self.attrs.iter()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

impl FromIterator<(AttrId, AttrValue)> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = (AttrId, AttrValue)>>(iter: I) -> Self {
        Self {
            attrs: iter.into_iter().collect(),
        }
    }
}
