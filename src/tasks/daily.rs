//! Date-driven checks that inject domain events.

use crate::config::{NoticeBlock, ScheduleConfig};
use crate::router::EventRouter;
use async_trait::async_trait;
use chatter_proto::{DomainEvent, EventKind, Target, UserId};
use chrono::{Datelike, Local, NaiveDate};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("payload for notice {index} is not representable as JSON: {source}")]
    Payload {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Failed(String),
}

/// A check evaluated once per interval against the current date.
#[async_trait]
pub trait DailyCheck: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Events to route for `today`. An empty list means nothing is due.
    async fn run(&self, today: NaiveDate) -> Result<Vec<DomainEvent>, CheckError>;
}

/// Calendar notices from `[[schedule.notices]]`.
pub struct ScheduledNotices {
    notices: Vec<NoticeBlock>,
}

impl ScheduledNotices {
    pub fn new(notices: Vec<NoticeBlock>) -> Self {
        Self { notices }
    }

    pub fn from_config(config: &ScheduleConfig) -> Self {
        Self::new(config.notices.clone())
    }
}

#[async_trait]
impl DailyCheck for ScheduledNotices {
    fn name(&self) -> &'static str {
        "scheduled_notices"
    }

    async fn run(&self, today: NaiveDate) -> Result<Vec<DomainEvent>, CheckError> {
        self.notices
            .iter()
            .enumerate()
            .filter(|(_, n)| n.month == today.month() && n.day == today.day())
            .map(|(index, notice)| {
                let payload = serde_json::value::to_raw_value(&notice.payload)
                    .map_err(|source| CheckError::Payload { index, source })?;
                let users = notice.users.iter().map(|u| UserId::from(u.as_str())).collect();
                Ok(DomainEvent::new(EventKind::Notification, Target::Users(users), payload))
            })
            .collect()
    }
}

/// Last calendar date the checks ran, optionally kept in a file so it
/// survives restarts.
#[derive(Debug, Default)]
pub struct RunLog {
    path: Option<PathBuf>,
    last: Option<NaiveDate>,
}

impl RunLog {
    /// Load the log from `path`. A missing or unreadable file counts as
    /// never having run.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last = match tokio::fs::read_to_string(&path).await {
            Ok(text) => match text.trim().parse::<NaiveDate>() {
                Ok(date) => Some(date),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable daily run log");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read daily run log");
                None
            }
        };
        Self {
            path: Some(path),
            last,
        }
    }

    /// Log configured by `[schedule]`.
    pub async fn from_config(config: &ScheduleConfig) -> Self {
        match &config.state_file {
            Some(path) => Self::open(path).await,
            None => Self::default(),
        }
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.last
    }

    /// Whether `today` has not been run yet. A clock that moved backwards
    /// does not rerun an earlier date.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.last.is_none_or(|last| today > last)
    }

    /// Mark `today` as run. A failed write is logged; the in-memory date
    /// still prevents reruns until restart.
    pub async fn record(&mut self, today: NaiveDate) {
        self.last = Some(today);
        if let Some(path) = &self.path
            && let Err(e) = tokio::fs::write(path, today.to_string()).await
        {
            warn!(path = %path.display(), error = %e, "Failed to write daily run log");
        }
    }
}

/// Evaluate every check for `today` and route what they return.
///
/// Returns the number of events routed.
pub async fn run_checks(
    router: &EventRouter,
    checks: &[Arc<dyn DailyCheck>],
    today: NaiveDate,
) -> usize {
    let mut routed = 0;
    for check in checks {
        let events = match check.run(today).await {
            Ok(events) => events,
            Err(e) => {
                warn!(check = check.name(), error = %e, "Daily check failed");
                continue;
            }
        };
        for event in &events {
            match router.publish(event) {
                Ok(report) => {
                    routed += 1;
                    debug!(
                        check = check.name(),
                        kind = event.kind.as_str(),
                        delivered = report.delivered,
                        "Daily check event routed"
                    );
                }
                Err(e) => warn!(check = check.name(), error = %e, "Daily check event not routed"),
            }
        }
    }
    routed
}

/// Spawn the daily-check task.
///
/// The date is polled immediately and then every `interval`; the checks run
/// the first time each calendar date is seen and not again for that date.
pub fn spawn_daily_checks(
    router: EventRouter,
    checks: Vec<Arc<dyn DailyCheck>>,
    interval: Duration,
    mut log: RunLog,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    let today = Local::now().date_naive();
                    if log.is_due(today) {
                        let routed = run_checks(&router, &checks, today).await;
                        log.record(today).await;
                        info!(%today, checks = checks.len(), routed, "Daily checks complete");
                    } else {
                        debug!(%today, "Daily checks already ran for this date");
                    }
                }
            }
        }
    })
}
