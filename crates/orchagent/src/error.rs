//! Error types shared by the resource managers and the reconciliation driver.

use sonic_orch_common::RefMapError;
use sonic_sai::SaiError;
use std::fmt;

/// How a failure must be treated by whoever drives reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Desired state cannot be realized on this hardware. Reject the delta.
    ConfigInvalid,
    /// The adapter reported a failure; hardware consistency is unknown.
    Hardware,
    /// Internal bookkeeping is inconsistent.
    Invariant,
}

impl ErrorClass {
    /// Whether the switch instance must stop accepting updates.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, ErrorClass::ConfigInvalid)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::ConfigInvalid => write!(f, "configuration-invalid"),
            ErrorClass::Hardware => write!(f, "hardware"),
            ErrorClass::Invariant => write!(f, "invariant"),
        }
    }
}

/// Error type for resource manager operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManagerError {
    #[error(transparent)]
    Sai(#[from] SaiError),

    /// The request names something the hardware cannot do.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A dependency of the request is not programmed.
    #[error("{kind} {key} not found")]
    NotFound { kind: &'static str, key: String },

    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl ManagerError {
    pub fn not_found(kind: &'static str, key: impl fmt::Display) -> Self {
        ManagerError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ManagerError::Sai(SaiError::NotSupported { .. }) | ManagerError::Unsupported(_) => {
                ErrorClass::ConfigInvalid
            }
            ManagerError::Sai(_) => ErrorClass::Hardware,
            ManagerError::NotFound { .. } | ManagerError::Invariant(_) => ErrorClass::Invariant,
        }
    }
}

impl From<RefMapError> for ManagerError {
    fn from(err: RefMapError) -> Self {
        ManagerError::Invariant(format!("reference count: {}", err))
    }
}

/// Result type for resource manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;
