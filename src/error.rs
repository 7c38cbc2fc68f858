//! Unified error handling for chatterd.
//!
//! Handler errors are logged and counted, never sent to a client. Delivery
//! errors mark a single connection as failed without touching other
//! recipients of the same event.

use chatter_proto::ProtocolError;
use thiserror::Error;

// ============================================================================
// Handler Errors (client event processing)
// ============================================================================

/// Errors that can occur while handling a client event.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The frame could not be decoded into a known event.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An anonymous connection sent a relayed event without naming a sender.
    #[error("{event}: anonymous connection supplied no sender")]
    MissingSender { event: &'static str },

    /// The connection is no longer live.
    #[error("connection {0} is not live")]
    NotConnected(String),
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Protocol(e) => e.code(),
            Self::MissingSender { .. } => "missing_sender",
            Self::NotConnected(_) => "not_connected",
        }
    }

    /// True for errors caused by what the client sent, as opposed to server state.
    pub fn is_malformed(&self) -> bool {
        match self {
            Self::Protocol(e) => !matches!(e, ProtocolError::Encode { .. }),
            Self::MissingSender { .. } => true,
            Self::NotConnected(_) => false,
        }
    }
}

/// Result type for event handlers.
pub type HandlerResult<T = ()> = Result<T, HandlerError>;

// ============================================================================
// Delivery Errors (per-connection outbound queue)
// ============================================================================

/// Why a frame could not be queued for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The connection's send queue is full.
    #[error("send queue full")]
    QueueFull,

    /// The connection's writer has gone away.
    #[error("connection closed")]
    Closed,
}

impl DeliveryError {
    /// Static label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::QueueFull => "sendq_full",
            Self::Closed => "closed",
        }
    }
}

impl<T> From<tokio::sync::mpsc::error::TrySendError<T>> for DeliveryError {
    fn from(err: tokio::sync::mpsc::error::TrySendError<T>) -> Self {
        match err {
            tokio::sync::mpsc::error::TrySendError::Full(_) => Self::QueueFull,
            tokio::sync::mpsc::error::TrySendError::Closed(_) => Self::Closed,
        }
    }
}
