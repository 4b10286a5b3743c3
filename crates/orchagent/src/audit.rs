//! Structured audit records for hardware-affecting actions.
//!
//! Every record is logged on the `audit` target as one line carrying a JSON
//! document, so an operator can route it apart from operational logs.
//!
//! ```
//! use sonic_orchagent::audit::{AuditCategory, AuditOutcome, AuditRecord};
//! use sonic_orchagent::audit_log;
//!
//! audit_log!(
//!     AuditRecord::new(AuditCategory::ResourceCreate, "VlanManager", "add_vlan")
//!         .with_outcome(AuditOutcome::Success)
//!         .with_object_id("Vlan10")
//!         .with_object_type("vlan")
//! );
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use log::Level;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const AUDIT_TARGET: &str = "audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCategory {
    /// Agent or update loop started or stopped.
    SystemLifecycle,
    ResourceCreate,
    ResourceDelete,
    /// Lane reprogramming of a port group.
    PortReconfiguration,
    WarmRestart,
    /// The switch stopped accepting updates.
    ErrorCondition,
}

impl AuditCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditCategory::SystemLifecycle => "SYSTEM_LIFECYCLE",
            AuditCategory::ResourceCreate => "RESOURCE_CREATE",
            AuditCategory::ResourceDelete => "RESOURCE_DELETE",
            AuditCategory::PortReconfiguration => "PORT_RECONFIGURATION",
            AuditCategory::WarmRestart => "WARM_RESTART",
            AuditCategory::ErrorCondition => "ERROR_CONDITION",
        }
    }
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Success,
    Failure,
    InProgress,
    /// Refused before touching hardware.
    Denied,
}

impl AuditOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "success",
            AuditOutcome::Failure => "failure",
            AuditOutcome::InProgress => "in_progress",
            AuditOutcome::Denied => "denied",
        }
    }

    /// Log level records with this outcome are emitted at.
    pub const fn level(&self) -> Level {
        match self {
            AuditOutcome::Success => Level::Info,
            AuditOutcome::InProgress => Level::Debug,
            AuditOutcome::Failure | AuditOutcome::Denied => Level::Warn,
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audited action. Built once, then handed to [`audit_log!`](crate::audit_log).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub category: AuditCategory,
    /// Component that performed the action.
    pub source: String,
    pub action: String,
    pub outcome: AuditOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    pub fn new(
        category: AuditCategory,
        source: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            source: source.into(),
            action: action.into(),
            outcome: AuditOutcome::InProgress,
            object_id: None,
            object_type: None,
            details: None,
            error: None,
        }
    }

    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    pub fn with_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = Some(object_type.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attaches an error and marks the record failed.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.outcome = AuditOutcome::Failure;
        self
    }

    /// `CATEGORY source.action outcome [type:id]`
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} {}.{} {}",
            self.category, self.source, self.action, self.outcome
        );
        match (&self.object_type, &self.object_id) {
            (Some(kind), Some(id)) => line.push_str(&format!(" [{}:{}]", kind, id)),
            (None, Some(id)) => line.push_str(&format!(" [{}]", id)),
            (Some(kind), None) => line.push_str(&format!(" [{}]", kind)),
            (None, None) => {}
        }
        line
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"timestamp":"{}","error":"audit record not serializable: {}"}}"#,
                self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                e
            )
        })
    }
}

/// Logs `record` on [`AUDIT_TARGET`] at its outcome's level.
pub fn emit(record: &AuditRecord) {
    let level = record.outcome.level();
    if log::log_enabled!(target: AUDIT_TARGET, level) {
        log::log!(target: AUDIT_TARGET, level, "AUDIT: {} {}", record.summary(), record.to_json());
    }
}

/// Emits an [`AuditRecord`](crate::audit::AuditRecord) on the `audit` target.
#[macro_export]
macro_rules! audit_log {
    ($record:expr) => {
        $crate::audit::emit(&$record)
    };
}
