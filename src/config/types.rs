//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use super::limits::LimitsConfig;
use super::listen::{ListenConfig, TlsConfig};
use super::schedule::ScheduleConfig;
use super::validation::{self, ValidationError};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    pub server: ServerConfig,
    /// WebSocket listen configuration.
    pub listen: ListenConfig,
    /// Optional WSS listen configuration.
    pub tls: Option<TlsConfig>,
    /// Optional internal HTTP API for collaborators.
    pub http: Option<HttpConfig>,
    /// Per-connection limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Background daily checks.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        validation::validate(&config).map_err(ConfigError::Invalid)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, used in logs.
    pub name: String,
    /// Node id (3 characters), prefixed to every connection handle.
    #[serde(default = "default_node_id")]
    pub node_id: String,
    /// Dedicated Prometheus metrics port. 0 or unset disables it.
    pub metrics_port: Option<u16>,
    /// Idle timeout configuration for ping keepalive.
    #[serde(default)]
    pub idle_timeouts: IdleTimeoutsConfig,
}

/// Idle timeout configuration for connection keepalive.
///
/// - `ping`: Seconds of inbound silence before a WebSocket ping is sent (default: 30)
/// - `timeout`: Further seconds to wait for any inbound frame before closing (default: 30)
#[derive(Debug, Clone, Deserialize)]
pub struct IdleTimeoutsConfig {
    /// Seconds of idle before sending a ping (default: 30).
    #[serde(default = "default_ping_interval")]
    pub ping: u64,

    /// Seconds to wait after the ping before disconnect (default: 30).
    /// Total idle time before disconnect = ping + timeout.
    #[serde(default = "default_ping_timeout")]
    pub timeout: u64,
}

impl Default for IdleTimeoutsConfig {
    fn default() -> Self {
        Self {
            ping: default_ping_interval(),
            timeout: default_ping_timeout(),
        }
    }
}

fn default_node_id() -> String {
    "0RT".to_string()
}

fn default_ping_interval() -> u64 {
    30
}

fn default_ping_timeout() -> u64 {
    30
}

/// Internal HTTP API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Address to bind to (e.g., "127.0.0.1:5001").
    pub address: SocketAddr,
    /// Shared secret expected in the `x-internal-token` header.
    /// Unset means the API is open; bind it to a private interface.
    pub internal_token: Option<String>,
}
