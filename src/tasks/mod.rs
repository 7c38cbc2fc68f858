//! Background tasks.

pub mod daily;

pub use daily::{CheckError, DailyCheck, RunLog, ScheduledNotices, spawn_daily_checks};
