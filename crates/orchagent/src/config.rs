//! Agent configuration file.
//!
//! ```toml
//! [switch]
//! platform = "fake"
//! src_mac = "02:00:00:00:00:01"
//! ports = [16]
//!
//! [daemon]
//! queue_depth = 64
//!
//! [[port_group]]
//! ports = [0, 1, 2, 3]
//! lane_speeds = ["10G", "25G"]
//! ```

use crate::daemon::OrchDaemonConfig;
use crate::platform::{Platform, PlatformKind};
use crate::ports::PORTS_PER_GROUP;
use log::info;
use serde::{Deserialize, Serialize};
use sonic_types::{MacAddress, PortId, PortSpeed};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SwitchSection {
    #[serde(default)]
    pub platform: PlatformKind,

    /// Source MAC applied when desired state leaves it unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_mac: Option<MacAddress>,

    /// Ports that belong to no port group.
    #[serde(default)]
    pub ports: Vec<PortId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonSection {
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortGroupSection {
    /// Lanes of the group, controlling port first.
    pub ports: Vec<PortId>,

    /// Overrides the platform's serdes lane speeds for every port of the
    /// group, most preferred first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane_speeds: Option<Vec<PortSpeed>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub switch: SwitchSection,

    #[serde(default)]
    pub daemon: DaemonSection,

    #[serde(default, rename = "port_group")]
    pub port_groups: Vec<PortGroupSection>,
}

fn default_queue_depth() -> usize {
    64
}

impl Default for DaemonSection {
    fn default() -> Self {
        Self {
            queue_depth: default_queue_depth(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| match e {
                ConfigError::Parse { message, .. } => ConfigError::Parse {
                    path: path.display().to_string(),
                    message,
                },
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.daemon.queue_depth == 0 {
            return Err(ConfigError::Invalid("queue_depth must be > 0".to_string()));
        }

        let mut seen = BTreeSet::new();
        for group in &self.port_groups {
            if group.ports.len() != PORTS_PER_GROUP {
                return Err(ConfigError::Invalid(format!(
                    "port group {:?} has {} ports, expected {}",
                    group.ports,
                    group.ports.len(),
                    PORTS_PER_GROUP
                )));
            }
            let in_order = group
                .ports
                .windows(2)
                .all(|pair| pair[0].as_raw().checked_add(1) == Some(pair[1].as_raw()));
            if !in_order {
                return Err(ConfigError::Invalid(format!(
                    "port group {:?} is not in lane order",
                    group.ports
                )));
            }
            match &group.lane_speeds {
                Some(speeds) if speeds.is_empty() || speeds.contains(&PortSpeed::Default) => {
                    return Err(ConfigError::Invalid(format!(
                        "port group {:?} needs explicit lane speeds",
                        group.ports
                    )));
                }
                _ => {}
            }
            for port in &group.ports {
                if !seen.insert(*port) {
                    return Err(ConfigError::Invalid(format!("{} is in two port groups", port)));
                }
            }
        }

        for port in &self.switch.ports {
            if !seen.insert(*port) {
                return Err(ConfigError::Invalid(format!("{} is listed twice", port)));
            }
        }
        Ok(())
    }

    /// The platform variant with every configured port registered.
    pub fn platform(&self) -> Platform {
        let mut platform = Platform::new(self.switch.platform);
        for group in &self.port_groups {
            for port in &group.ports {
                platform.add_port(*port, group.lane_speeds.clone());
            }
        }
        for port in &self.switch.ports {
            platform.add_port(*port, None);
        }
        platform
    }

    pub fn groups(&self) -> Vec<Vec<PortId>> {
        self.port_groups
            .iter()
            .map(|group| group.ports.clone())
            .collect()
    }

    pub fn daemon_config(&self, warm_boot: bool) -> OrchDaemonConfig {
        OrchDaemonConfig {
            queue_depth: self.daemon.queue_depth,
            warm_boot,
        }
    }
}
