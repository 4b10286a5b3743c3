//! Port configuration values.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configured port speed.
///
/// `Default` means "let the hardware pick" and has no lane requirement of
/// its own, so it cannot drive lane-mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum PortSpeed {
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "1G")]
    Gige,
    #[serde(rename = "10G")]
    Xg,
    #[serde(rename = "20G")]
    TwentyG,
    #[serde(rename = "25G")]
    TwentyFiveG,
    #[serde(rename = "40G")]
    FortyG,
    #[serde(rename = "50G")]
    FiftyG,
    #[serde(rename = "100G")]
    HundredG,
}

impl PortSpeed {
    pub const ALL: [PortSpeed; 7] = [
        PortSpeed::Gige,
        PortSpeed::Xg,
        PortSpeed::TwentyG,
        PortSpeed::TwentyFiveG,
        PortSpeed::FortyG,
        PortSpeed::FiftyG,
        PortSpeed::HundredG,
    ];

    /// Speed in Mb/s; 0 for `Default`.
    pub const fn mbps(&self) -> u32 {
        match self {
            PortSpeed::Default => 0,
            PortSpeed::Gige => 1_000,
            PortSpeed::Xg => 10_000,
            PortSpeed::TwentyG => 20_000,
            PortSpeed::TwentyFiveG => 25_000,
            PortSpeed::FortyG => 40_000,
            PortSpeed::FiftyG => 50_000,
            PortSpeed::HundredG => 100_000,
        }
    }

    pub fn from_mbps(mbps: u32) -> Option<Self> {
        if mbps == 0 {
            return Some(PortSpeed::Default);
        }
        Self::ALL.into_iter().find(|speed| speed.mbps() == mbps)
    }
}

impl fmt::Display for PortSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSpeed::Default => write!(f, "default"),
            PortSpeed::Gige => write!(f, "1G"),
            other => write!(f, "{}G", other.mbps() / 1_000),
        }
    }
}

impl FromStr for PortSpeed {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("default") {
            return Ok(PortSpeed::Default);
        }
        s.strip_suffix(['G', 'g'])
            .and_then(|gbps| gbps.parse::<u32>().ok())
            .and_then(|gbps| gbps.checked_mul(1_000))
            .and_then(PortSpeed::from_mbps)
            .ok_or_else(|| ParseError::InvalidPortSpeed(s.to_string()))
    }
}

/// Administrative state of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    /// Port is administratively down (default for new ports).
    #[default]
    Down,
    Up,
}

impl AdminState {
    pub const fn is_up(&self) -> bool {
        matches!(self, AdminState::Up)
    }
}

impl From<bool> for AdminState {
    fn from(enabled: bool) -> Self {
        if enabled {
            AdminState::Up
        } else {
            AdminState::Down
        }
    }
}

impl fmt::Display for AdminState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminState::Up => write!(f, "up"),
            AdminState::Down => write!(f, "down"),
        }
    }
}

/// Forward error correction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FecMode {
    #[default]
    None,
    Rs,
    Fc,
}

impl FecMode {
    /// Hardware encoding of the mode.
    pub const fn as_hw(&self) -> i32 {
        match self {
            FecMode::None => 0,
            FecMode::Rs => 1,
            FecMode::Fc => 2,
        }
    }
}

impl FromStr for FecMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(FecMode::None),
            "rs" => Ok(FecMode::Rs),
            "fc" => Ok(FecMode::Fc),
            _ => Err(ParseError::InvalidFecMode(s.to_string())),
        }
    }
}
