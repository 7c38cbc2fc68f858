//! Telemetry utilities: event timing, span constructors and subscriber setup.

use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Guard for timing client event handling and recording metrics.
///
/// Records latency when dropped.
pub struct EventTimer {
    event: &'static str,
    start: Instant,
}

impl EventTimer {
    /// Start timing an event.
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            start: Instant::now(),
        }
    }
}

impl Drop for EventTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_event(self.event, duration);
    }
}

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG` (default `info`). Set `CHATTERD_LOG_FORMAT=json` for
/// one JSON object per line.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("CHATTERD_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for a client connection.
    pub fn connection(conn: &str, user: Option<&str>, addr: &str) -> Span {
        info_span!("connection", conn = %conn, user = user.unwrap_or("-"), addr = %addr)
    }

    /// Create a span for a routed domain event.
    pub fn route(kind: &str, target: &str) -> Span {
        info_span!("route", kind = %kind, target = %target)
    }
}
