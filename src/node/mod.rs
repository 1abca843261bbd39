// Node module - configuration and startup assembly for the host binary

pub mod bootstrap;
pub mod config;
mod stdio;

pub use bootstrap::{assemble, join_network, JoinState, NodeError, StartupLinks};
pub use config::{ConfigError, LinkPolicy, NetworkConfig, NodeConfig, NodeSettings, SerialConfig};
pub use stdio::StdioChannel;
