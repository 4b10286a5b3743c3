//! Adapter error types and status handling.
//!
//! Every call into the hardware adapter returns a [`SaiResult`]. A failure
//! reported by the adapter itself is a [`SaiError::Status`] carrying the
//! operation that produced it.

use std::fmt;
use thiserror::Error;

use crate::types::ObjectType;

/// Failure statuses an adapter reports, named after their `sai_status_t`
/// counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaiStatus {
    Failure,
    NotSupported,
    InsufficientResources,
    InvalidParameter,
    ItemAlreadyExists,
    ItemNotFound,
    TableFull,
    MandatoryAttributeMissing,
    ObjectInUse,
    InvalidObjectId,
}

impl SaiStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaiStatus::Failure => "SAI_STATUS_FAILURE",
            SaiStatus::NotSupported => "SAI_STATUS_NOT_SUPPORTED",
            SaiStatus::InsufficientResources => "SAI_STATUS_INSUFFICIENT_RESOURCES",
            SaiStatus::InvalidParameter => "SAI_STATUS_INVALID_PARAMETER",
            SaiStatus::ItemAlreadyExists => "SAI_STATUS_ITEM_ALREADY_EXISTS",
            SaiStatus::ItemNotFound => "SAI_STATUS_ITEM_NOT_FOUND",
            SaiStatus::TableFull => "SAI_STATUS_TABLE_FULL",
            SaiStatus::MandatoryAttributeMissing => "SAI_STATUS_MANDATORY_ATTRIBUTE_MISSING",
            SaiStatus::ObjectInUse => "SAI_STATUS_OBJECT_IN_USE",
            SaiStatus::InvalidObjectId => "SAI_STATUS_INVALID_OBJECT_ID",
        }
    }

    /// Statuses caused by the request itself rather than by hardware state.
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            SaiStatus::InvalidParameter
                | SaiStatus::MandatoryAttributeMissing
                | SaiStatus::InvalidObjectId
                | SaiStatus::ItemAlreadyExists
                | SaiStatus::ItemNotFound
        )
    }
}

impl fmt::Display for SaiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapter operation, carried in errors for context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaiOp {
    Create(ObjectType),
    Remove(ObjectType),
    SetAttribute(ObjectType),
    GetObjectCount(ObjectType),
}

impl fmt::Display for SaiOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaiOp::Create(t) => write!(f, "create {}", t),
            SaiOp::Remove(t) => write!(f, "remove {}", t),
            SaiOp::SetAttribute(t) => write!(f, "set {} attribute", t),
            SaiOp::GetObjectCount(t) => write!(f, "get {} object count", t),
        }
    }
}

/// Error type for adapter operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaiError {
    /// The adapter returned a raw failure status.
    #[error("{op} failed: {status}")]
    Status { op: SaiOp, status: SaiStatus },

    #[error("Feature not supported: {feature}")]
    NotSupported { feature: String },

    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("Item not found: {item}")]
    NotFound { item: String },

    #[error("Item already exists: {item}")]
    AlreadyExists { item: String },

    /// Object is still referenced and cannot be removed.
    #[error("Object in use: {object}")]
    ObjectInUse { object: String },

    #[error("Mandatory attribute {attribute} missing for {object_type}")]
    MandatoryAttributeMissing {
        object_type: ObjectType,
        attribute: &'static str,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SaiError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        SaiError::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn not_found(item: impl Into<String>) -> Self {
        SaiError::NotFound { item: item.into() }
    }

    pub fn already_exists(item: impl Into<String>) -> Self {
        SaiError::AlreadyExists { item: item.into() }
    }

    pub fn object_in_use(object: impl Into<String>) -> Self {
        SaiError::ObjectInUse {
            object: object.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SaiError::Internal {
            message: message.into(),
        }
    }

    /// The status code a driver would report for this error.
    pub fn status(&self) -> SaiStatus {
        match self {
            SaiError::Status { status, .. } => *status,
            SaiError::NotSupported { .. } => SaiStatus::NotSupported,
            SaiError::InvalidParameter { .. } => SaiStatus::InvalidParameter,
            SaiError::NotFound { .. } => SaiStatus::ItemNotFound,
            SaiError::AlreadyExists { .. } => SaiStatus::ItemAlreadyExists,
            SaiError::ObjectInUse { .. } => SaiStatus::ObjectInUse,
            SaiError::MandatoryAttributeMissing { .. } => SaiStatus::MandatoryAttributeMissing,
            SaiError::Internal { .. } => SaiStatus::Failure,
        }
    }
}

/// Result type for adapter operations.
pub type SaiResult<T> = Result<T, SaiError>;
