// Node Configuration
// TOML file describing which links the node brings up and how they are arbitrated

use crate::join::{CredentialList, JoinConfig};
use crate::link::{LinkError, SocketConfig, WirelessConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Link(#[from] LinkError),
}

// ============================================================================
// LINK POLICY
// ============================================================================

/// How the configured links are combined into the node's single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LinkPolicy {
    /// One active link at a time, following observed traffic
    #[default]
    Failover,
    /// Every connected link carries every frame
    FanOut,
    /// Use the socket link if the network join worked, else the next configured link
    Fallback,
}

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    pub policy: LinkPolicy,
    /// Period of the cooperative poll loop, in milliseconds
    pub tick_ms: u64,
    /// Failover health check period, in polls
    pub health_check_ticks: u32,
    /// Write every received frame straight back out
    pub echo: bool,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            policy: LinkPolicy::Failover,
            tick_ms: 10,
            health_check_ticks: 1,
            echo: false,
        }
    }
}

/// Serial link section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Channel the serial link runs over; the host build supports `stdio`
    pub device: String,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "stdio".to_string(),
        }
    }
}

/// Station-mode network the socket link depends on
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub credentials: CredentialList,
    pub join: JoinConfig,
}

// ============================================================================
// NODE CONFIG
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub node: NodeSettings,
    pub serial: Option<SerialConfig>,
    pub socket: Option<SocketConfig>,
    pub wireless: Option<WirelessConfig>,
    pub network: NetworkConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node: NodeSettings::default(),
            serial: None,
            socket: None,
            wireless: None,
            network: NetworkConfig::default(),
        }
    }
}

impl NodeConfig {
    /// No links configured; add at least one before validating
    pub fn new() -> Self {
        Self::default()
    }

    /// Socket link on the default port and nothing else
    pub fn listening() -> Self {
        Self::default().with_socket(SocketConfig::default())
    }

    /// Read and validate a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn with_policy(mut self, policy: LinkPolicy) -> Self {
        self.node.policy = policy;
        self
    }

    pub fn with_serial(mut self, serial: SerialConfig) -> Self {
        self.serial = Some(serial);
        self
    }

    pub fn with_socket(mut self, socket: SocketConfig) -> Self {
        self.socket = Some(socket);
        self
    }

    pub fn without_socket(mut self) -> Self {
        self.socket = None;
        self
    }

    pub fn with_wireless(mut self, wireless: WirelessConfig) -> Self {
        self.wireless = Some(wireless);
        self
    }

    /// Number of link sections present
    pub fn link_count(&self) -> usize {
        [
            self.serial.is_some(),
            self.socket.is_some(),
            self.wireless.is_some(),
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.tick_ms == 0 {
            return Err(ConfigError::Invalid("node.tick_ms cannot be 0".to_string()));
        }
        if self.node.health_check_ticks == 0 {
            return Err(ConfigError::Invalid(
                "node.health_check_ticks cannot be 0".to_string(),
            ));
        }
        if self.link_count() == 0 {
            return Err(ConfigError::Invalid("no link configured".to_string()));
        }
        if let Some(serial) = &self.serial {
            if serial.device.is_empty() {
                return Err(ConfigError::Invalid("serial.device cannot be empty".to_string()));
            }
        }
        if let Some(socket) = &self.socket {
            socket.validate()?;
        }
        if let Some(wireless) = &self.wireless {
            wireless.validate()?;
        }
        if self.network.join.attempt_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "network.join.attempt_timeout_ms cannot be 0".to_string(),
            ));
        }
        if self.socket.is_none() && self.network.credentials.has_usable() {
            tracing::warn!("network credentials configured without a socket link, they will be ignored");
        }
        Ok(())
    }
}
