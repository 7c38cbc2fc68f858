//! Prometheus metrics collection for chatterd.
//!
//! Exposed on the internal HTTP API and, optionally, on a dedicated metrics
//! port.
//!
//! ## Realtime-Specific Metrics
//!
//! - `chatter_client_events_total{event}` - Client events processed by name
//! - `chatter_event_duration_seconds{event}` - Handling latency histogram
//! - `chatter_routed_events_total{kind}` - Events routed by outbound name
//! - `chatter_fanout` - Recipients per routed event (histogram)

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Gauges (can increase/decrease)
// ========================================================================

/// Currently live WebSocket connections, identified or anonymous.
pub static LIVE_CONNECTIONS: OnceLock<IntGauge> = OnceLock::new();

/// Identities with at least one live connection.
pub static ONLINE_USERS: OnceLock<IntGauge> = OnceLock::new();

/// Groups with at least one joined connection.
pub static ACTIVE_ROOMS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Counters (monotonic increasing)
// ========================================================================

/// Client events processed by name.
pub static CLIENT_EVENTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Client event handling latency by name.
pub static EVENT_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Client event errors by name and error code.
pub static EVENT_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Routed events by outbound event name.
pub static ROUTED_EVENTS: OnceLock<IntCounterVec> = OnceLock::new();

/// Recipients per routed event.
pub static FANOUT: OnceLock<Histogram> = OnceLock::new();

/// Frames that could not be queued, by reason.
pub static DELIVERY_FAILURES: OnceLock<IntCounterVec> = OnceLock::new();

/// Presence snapshots announced.
pub static PRESENCE_ANNOUNCEMENTS: OnceLock<IntCounter> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; later calls are no-ops for metrics already set.
pub fn init() {
    let r = registry();

    // Helper macro to register metric
    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                match $init {
                    Ok(m) => {
                        if let Err(e) = r.register(Box::new(m.clone())) {
                            tracing::warn!(
                                error = %e,
                                concat!("Failed to register metric ", stringify!($metric))
                            );
                        }
                        let _ = $metric.set(m);
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            concat!("Failed to create metric ", stringify!($metric))
                        );
                    }
                }
            }
        };
    }

    register!(
        LIVE_CONNECTIONS,
        IntGauge::new("chatter_live_connections", "Currently live connections")
    );
    register!(
        ONLINE_USERS,
        IntGauge::new(
            "chatter_online_users",
            "Identities with at least one live connection"
        )
    );
    register!(
        ACTIVE_ROOMS,
        IntGauge::new(
            "chatter_active_rooms",
            "Groups with at least one joined connection"
        )
    );

    register!(
        CLIENT_EVENTS,
        IntCounterVec::new(
            Opts::new("chatter_client_events_total", "Client events processed by name"),
            &["event"]
        )
    );
    register!(
        EVENT_LATENCY,
        HistogramVec::new(
            HistogramOpts::new("chatter_event_duration_seconds", "Client event latency by name")
                .buckets(vec![0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
            &["event"]
        )
    );
    register!(
        EVENT_ERRORS,
        IntCounterVec::new(
            Opts::new("chatter_event_errors_total", "Client event errors by name"),
            &["event", "error"]
        )
    );
    register!(
        ROUTED_EVENTS,
        IntCounterVec::new(
            Opts::new("chatter_routed_events_total", "Events routed by outbound name"),
            &["kind"]
        )
    );
    register!(
        FANOUT,
        Histogram::with_opts(
            HistogramOpts::new("chatter_fanout", "Recipients per routed event")
                .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0])
        )
    );
    register!(
        DELIVERY_FAILURES,
        IntCounterVec::new(
            Opts::new("chatter_delivery_failures_total", "Frames that could not be queued"),
            &["reason"]
        )
    );
    register!(
        PRESENCE_ANNOUNCEMENTS,
        IntCounter::new(
            "chatter_presence_announcements_total",
            "Presence snapshots announced"
        )
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions for metric updates
// ============================================================================

/// Record a client event with latency.
#[inline]
pub fn record_event(event: &str, duration_secs: f64) {
    if let Some(c) = CLIENT_EVENTS.get() {
        c.with_label_values(&[event]).inc();
    }
    if let Some(h) = EVENT_LATENCY.get() {
        h.with_label_values(&[event]).observe(duration_secs);
    }
}

/// Record a client event error.
#[inline]
pub fn record_event_error(event: &str, error: &str) {
    if let Some(c) = EVENT_ERRORS.get() {
        c.with_label_values(&[event, error]).inc();
    }
}

/// Record one routed event and how many connections it was queued for.
#[inline]
pub fn record_route(kind: &str, recipients: usize) {
    if let Some(c) = ROUTED_EVENTS.get() {
        c.with_label_values(&[kind]).inc();
    }
    if let Some(h) = FANOUT.get() {
        h.observe(recipients as f64);
    }
}

/// Record a frame that could not be queued.
#[inline]
pub fn record_delivery_failure(reason: &str) {
    if let Some(c) = DELIVERY_FAILURES.get() {
        c.with_label_values(&[reason]).inc();
    }
}

/// Record a presence announcement.
#[inline]
pub fn record_presence_announcement() {
    if let Some(c) = PRESENCE_ANNOUNCEMENTS.get() {
        c.inc();
    }
}

/// Refresh the state gauges.
#[inline]
pub fn set_state_gauges(connections: usize, online: usize, rooms: usize) {
    if let Some(g) = LIVE_CONNECTIONS.get() {
        g.set(connections as i64);
    }
    if let Some(g) = ONLINE_USERS.get() {
        g.set(online as i64);
    }
    if let Some(g) = ACTIVE_ROOMS.get() {
        g.set(rooms as i64);
    }
}
