//! Connection - Handles an individual client connection.
//!
//! Each Connection runs in its own Tokio task:
//!
//! ```text
//!    ┌──────────────────────────────────────────────────┐
//!    │               Connection Task                    │
//!    │                                                  │
//!    │   ws stream ──▶ tokio::select! ◀── Mailbox       │
//!    │                    │    │                        │
//!    │         [Handlers] ◀┘    └──▶ ws sink (timeout)  │
//!    │             │                                    │
//!    │             ▼                                    │
//!    │       EventRouter ──▶ other connections' queues  │
//!    └──────────────────────────────────────────────────┘
//! ```
//!
//! Whatever ends the loop, the connection is removed from the hub before the
//! task returns.

pub mod handshake;

use crate::config::Config;
use crate::handlers::{self, Context};
use crate::router::EventRouter;
use crate::state::Session;
use crate::telemetry::spans;
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::{MissedTickBehavior, timeout};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

/// Longest gap between idle checks.
const MAX_PING_CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Inbound messages up to this multiple of `max_frame_bytes` are read and
/// dropped as oversized; anything larger fails the read and closes the
/// connection.
const TRANSPORT_LIMIT_FACTOR: usize = 4;

/// Timing and size limits applied to every connection.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub write_timeout: Duration,
    pub max_frame_bytes: usize,
    /// Inbound silence before a ping is sent.
    pub ping_after: Duration,
    /// Further silence after the ping before the connection is closed.
    pub ping_timeout: Duration,
}

impl ConnectionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            write_timeout: config.limits.write_timeout(),
            max_frame_bytes: config.limits.max_frame_bytes,
            ping_after: Duration::from_secs(config.server.idle_timeouts.ping),
            ping_timeout: Duration::from_secs(config.server.idle_timeouts.timeout),
        }
    }

    /// Largest message the WebSocket layer will buffer.
    pub fn max_message_bytes(&self) -> usize {
        self.max_frame_bytes.saturating_mul(TRANSPORT_LIMIT_FACTOR)
    }

    fn check_interval(&self) -> Duration {
        (self.ping_after.min(self.ping_timeout) / 2)
            .clamp(Duration::from_millis(50), MAX_PING_CHECK_INTERVAL)
    }
}

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    /// The client closed the socket.
    ClientClosed,
    /// Reading from the socket failed.
    ReadError(String),
    /// Writing to the socket failed.
    WriteError(String),
    /// A write did not finish within the write timeout.
    WriteTimeout,
    /// No inbound traffic within ping + timeout.
    IdleTimeout,
    /// The hub dropped the connection (queue full or closed).
    Evicted,
    /// The server is shutting down.
    Shutdown,
}

impl fmt::Display for Exit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientClosed => f.write_str("client closed"),
            Self::ReadError(e) => write!(f, "read error: {e}"),
            Self::WriteError(e) => write!(f, "write error: {e}"),
            Self::WriteTimeout => f.write_str("write timeout"),
            Self::IdleTimeout => f.write_str("ping timeout"),
            Self::Evicted => f.write_str("evicted"),
            Self::Shutdown => f.write_str("server shutdown"),
        }
    }
}

/// A client connection handler.
pub struct Connection<S> {
    ws: WebSocketStream<S>,
    addr: SocketAddr,
    session: Session,
    router: EventRouter,
    settings: ConnectionSettings,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        ws: WebSocketStream<S>,
        addr: SocketAddr,
        session: Session,
        router: EventRouter,
        settings: ConnectionSettings,
    ) -> Self {
        Self {
            ws,
            addr,
            session,
            router,
            settings,
        }
    }

    /// Run the connection until it ends, then unregister it.
    pub async fn run(self, shutdown: CancellationToken) -> Exit {
        let span = spans::connection(
            self.session.conn.as_str(),
            self.session.user.as_ref().map(|u| u.as_str()),
            &self.addr.to_string(),
        );
        self.run_inner(shutdown).instrument(span).await
    }

    async fn run_inner(self, shutdown: CancellationToken) -> Exit {
        let Self {
            ws,
            addr: _,
            mut session,
            router,
            settings,
        } = self;
        let (mut sink, mut stream) = ws.split();

        let mut last_activity = Instant::now();
        let mut ping_sent = false;
        let mut idle_check = tokio::time::interval(settings.check_interval());
        idle_check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let exit = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break Exit::Shutdown,

                _ = session.closed.cancelled() => break Exit::Evicted,

                frame = session.mailbox.recv() => {
                    let Some(frame) = frame else {
                        break Exit::Evicted;
                    };
                    let write = sink.send(Message::Text(frame.to_string()));
                    match timeout(settings.write_timeout, write).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => break Exit::WriteError(e.to_string()),
                        Err(_) => break Exit::WriteTimeout,
                    }
                }

                msg = stream.next() => {
                    let msg = match msg {
                        None => break Exit::ClientClosed,
                        Some(Err(e)) => break Exit::ReadError(e.to_string()),
                        Some(Ok(msg)) => msg,
                    };
                    last_activity = Instant::now();
                    ping_sent = false;

                    match msg {
                        Message::Text(text) => {
                            let ctx = Context {
                                conn: &session.conn,
                                user: session.user.as_ref(),
                                router: &router,
                            };
                            let handled =
                                handlers::handle_frame(&ctx, &text, settings.max_frame_bytes);
                            if let Err(e) = handled {
                                if e.is_malformed() {
                                    warn!(
                                        error = %e,
                                        code = e.error_code(),
                                        "Dropping malformed event"
                                    );
                                } else {
                                    info!(
                                        error = %e,
                                        code = e.error_code(),
                                        "Event handling failed"
                                    );
                                }
                            }
                        }
                        Message::Binary(data) => {
                            debug!(len = data.len(), "Ignoring binary frame");
                        }
                        Message::Close(_) => break Exit::ClientClosed,
                        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                    }
                }

                _ = idle_check.tick() => {
                    let idle = last_activity.elapsed();
                    if idle >= settings.ping_after + settings.ping_timeout {
                        break Exit::IdleTimeout;
                    }
                    if idle >= settings.ping_after && !ping_sent {
                        ping_sent = true;
                        let ping = sink.send(Message::Ping(Vec::new()));
                        match timeout(settings.write_timeout, ping).await {
                            Ok(Ok(())) => debug!(idle_secs = idle.as_secs(), "Sent keepalive ping"),
                            Ok(Err(e)) => break Exit::WriteError(e.to_string()),
                            Err(_) => break Exit::WriteTimeout,
                        }
                    }
                }
            }
        };

        router.hub().disconnect(&session.conn);
        if !matches!(exit, Exit::ReadError(_) | Exit::WriteError(_) | Exit::WriteTimeout) {
            let _ = timeout(settings.write_timeout, sink.close()).await;
        }
        info!(reason = %exit, "Connection closed");
        exit
    }
}
