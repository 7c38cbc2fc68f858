//! Per-connection limits configuration.

use serde::Deserialize;
use std::time::Duration;

/// Per-connection limits.
///
/// These bound how much memory and time a single slow or abusive client can
/// consume before it is treated as failed.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Outbound frames queued per connection before it counts as stuck (default: 256).
    #[serde(default = "default_sendq")]
    pub sendq: usize,
    /// Milliseconds a single socket write may take (default: 5000).
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Largest inbound text frame accepted, in bytes (default: 65536).
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl LimitsConfig {
    /// Write timeout as a duration.
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            sendq: default_sendq(),
            write_timeout_ms: default_write_timeout_ms(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

fn default_sendq() -> usize {
    256
}

fn default_write_timeout_ms() -> u64 {
    5000
}

fn default_max_frame_bytes() -> usize {
    chatter_proto::DEFAULT_MAX_FRAME_BYTES
}
