//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, HttpConfig)
//! - [`listen`]: Network listener configuration (ListenConfig, TlsConfig)
//! - [`limits`]: Per-connection limits (LimitsConfig)
//! - [`schedule`]: Background daily checks (ScheduleConfig, NoticeBlock)
//! - [`validation`]: Startup validation pass

mod limits;
mod listen;
mod schedule;
mod types;
pub mod validation;

pub use limits::LimitsConfig;
pub use listen::{ListenConfig, TlsConfig};
pub use schedule::{NoticeBlock, ScheduleConfig};
pub use types::{Config, ConfigError, HttpConfig, IdleTimeoutsConfig, ServerConfig};
pub use validation::ValidationError;
