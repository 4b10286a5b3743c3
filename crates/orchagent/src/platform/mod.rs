//! Platform collaborators.
//!
//! A platform knows what each front-panel port can physically do and owns
//! the transceiver side of a port. The agent talks to it through a single
//! [`PlatformPort`] interface; the variant is picked from configuration.

mod fake;
mod wedge100;

pub use fake::FakePlatformPort;
pub use wedge100::Wedge100Port;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sonic_types::{PortId, PortSpeed};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Per-port platform capabilities and transceiver hooks.
pub trait PlatformPort: Send + Sync {
    fn port_id(&self) -> PortId;

    fn supported_speeds(&self) -> &[PortSpeed];

    /// Serdes lane speeds, in the order lane-mode selection tries them.
    fn supported_lane_speeds(&self) -> &[PortSpeed];

    fn supports_speed(&self, speed: PortSpeed) -> bool {
        speed == PortSpeed::Default || self.supported_speeds().contains(&speed)
    }

    /// The port's configured speed changed; transceivers may need retuning.
    fn link_speed_changed(&self, speed: PortSpeed);

    fn pre_port_disable(&self) {}

    fn post_port_enable(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// Simulation; records every transceiver notification.
    #[default]
    Fake,
    Wedge100,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformKind::Fake => write!(f, "fake"),
            PlatformKind::Wedge100 => write!(f, "wedge100"),
        }
    }
}

/// A transceiver-side notification, as recorded by the fake platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    SpeedChanged { port: PortId, speed: PortSpeed },
    PreDisable(PortId),
    PostEnable(PortId),
}

pub struct Platform {
    kind: PlatformKind,
    ports: BTreeMap<PortId, Arc<dyn PlatformPort>>,
    events: Arc<Mutex<Vec<PlatformEvent>>>,
}

impl Platform {
    pub fn new(kind: PlatformKind) -> Self {
        Self {
            kind,
            ports: BTreeMap::new(),
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn kind(&self) -> PlatformKind {
        self.kind
    }

    /// Registers a port, optionally overriding the variant's lane speeds.
    pub fn add_port(&mut self, id: PortId, lane_speeds: Option<Vec<PortSpeed>>) {
        let port: Arc<dyn PlatformPort> = match self.kind {
            PlatformKind::Fake => Arc::new(FakePlatformPort::new(
                id,
                lane_speeds,
                Arc::clone(&self.events),
            )),
            PlatformKind::Wedge100 => Arc::new(Wedge100Port::new(id, lane_speeds)),
        };
        self.ports.insert(id, port);
    }

    pub fn port(&self, id: PortId) -> Option<Arc<dyn PlatformPort>> {
        self.ports.get(&id).cloned()
    }

    /// Notifications recorded so far. Only the fake variant records.
    pub fn events(&self) -> Vec<PlatformEvent> {
        self.events.lock().clone()
    }
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("kind", &self.kind)
            .field("ports", &self.ports.keys().collect::<Vec<_>>())
            .finish()
    }
}
