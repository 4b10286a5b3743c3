use super::PlatformPort;
use log::info;
use sonic_types::{PortId, PortSpeed};

const SUPPORTED_SPEEDS: [PortSpeed; 6] = [
    PortSpeed::Xg,
    PortSpeed::TwentyG,
    PortSpeed::TwentyFiveG,
    PortSpeed::FortyG,
    PortSpeed::FiftyG,
    PortSpeed::HundredG,
];

const LANE_SPEEDS: [PortSpeed; 2] = [PortSpeed::Xg, PortSpeed::TwentyFiveG];

/// 32x100G port on a Tomahawk-based Wedge 100.
pub struct Wedge100Port {
    id: PortId,
    lane_speeds: Vec<PortSpeed>,
}

impl Wedge100Port {
    pub fn new(id: PortId, lane_speeds: Option<Vec<PortSpeed>>) -> Self {
        Self {
            id,
            lane_speeds: lane_speeds.unwrap_or_else(|| LANE_SPEEDS.to_vec()),
        }
    }
}

impl PlatformPort for Wedge100Port {
    fn port_id(&self) -> PortId {
        self.id
    }

    fn supported_speeds(&self) -> &[PortSpeed] {
        &SUPPORTED_SPEEDS
    }

    fn supported_lane_speeds(&self) -> &[PortSpeed] {
        &self.lane_speeds
    }

    fn link_speed_changed(&self, speed: PortSpeed) {
        // Optics retuning belongs to the transceiver service.
        info!("{} speed changed to {}, transceiver notified", self.id, speed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gige_unsupported() {
        let port = Wedge100Port::new(PortId::new(0), None);
        assert!(!port.supports_speed(PortSpeed::Gige));
        assert!(port.supports_speed(PortSpeed::HundredG));
        assert!(port.supports_speed(PortSpeed::Default));
    }
}
