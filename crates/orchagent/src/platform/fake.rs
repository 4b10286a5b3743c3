use super::{PlatformEvent, PlatformPort};
use parking_lot::Mutex;
use sonic_types::{PortId, PortSpeed};
use std::sync::Arc;

const DEFAULT_LANE_SPEEDS: [PortSpeed; 2] = [PortSpeed::Xg, PortSpeed::TwentyFiveG];

/// Simulated port: supports every speed and records notifications.
pub struct FakePlatformPort {
    id: PortId,
    lane_speeds: Vec<PortSpeed>,
    events: Arc<Mutex<Vec<PlatformEvent>>>,
}

impl FakePlatformPort {
    pub fn new(
        id: PortId,
        lane_speeds: Option<Vec<PortSpeed>>,
        events: Arc<Mutex<Vec<PlatformEvent>>>,
    ) -> Self {
        Self {
            id,
            lane_speeds: lane_speeds.unwrap_or_else(|| DEFAULT_LANE_SPEEDS.to_vec()),
            events,
        }
    }
}

impl PlatformPort for FakePlatformPort {
    fn port_id(&self) -> PortId {
        self.id
    }

    fn supported_speeds(&self) -> &[PortSpeed] {
        &PortSpeed::ALL
    }

    fn supported_lane_speeds(&self) -> &[PortSpeed] {
        &self.lane_speeds
    }

    fn link_speed_changed(&self, speed: PortSpeed) {
        self.events.lock().push(PlatformEvent::SpeedChanged {
            port: self.id,
            speed,
        });
    }

    fn pre_port_disable(&self) {
        self.events.lock().push(PlatformEvent::PreDisable(self.id));
    }

    fn post_port_enable(&self) {
        self.events.lock().push(PlatformEvent::PostEnable(self.id));
    }
}
