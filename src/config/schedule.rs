//! Background daily-check configuration.

use serde::Deserialize;

/// `[schedule]` block.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between date polls (default: 3600). Checks run once per
    /// calendar date however often the date is polled.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// File recording the last date the checks ran, so a restart on the
    /// same date does not run them again.
    #[serde(default)]
    pub state_file: Option<String>,
    /// Calendar notices delivered as `notification:new`.
    #[serde(default)]
    pub notices: Vec<NoticeBlock>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            state_file: None,
            notices: Vec::new(),
        }
    }
}

fn default_interval_secs() -> u64 {
    3600
}

/// A `[[schedule.notices]]` entry: on `month`/`day`, notify `users`.
#[derive(Debug, Clone, Deserialize)]
pub struct NoticeBlock {
    /// Month, 1-12.
    pub month: u32,
    /// Day of month, 1-31.
    pub day: u32,
    /// Recipients.
    pub users: Vec<String>,
    /// Notification body, forwarded as JSON.
    pub payload: toml::Value,
}
