//! Protocol errors.

use thiserror::Error;

/// Errors produced while decoding or encoding wire frames.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The frame is not a JSON envelope.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    /// The envelope names an event outside the closed set.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// The envelope's `data` does not match the event's payload shape.
    #[error("invalid payload for {event}: {source}")]
    InvalidPayload {
        /// Event name the payload belonged to.
        event: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A required addressing field is present but empty.
    #[error("{event}: field `{field}` must not be empty")]
    EmptyField {
        /// Event name.
        event: &'static str,
        /// Offending field.
        field: &'static str,
    },

    /// The frame exceeds the configured size limit.
    #[error("frame of {len} bytes exceeds limit of {max}")]
    FrameTooLarge {
        /// Actual frame length in bytes.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Serializing an outbound frame failed.
    #[error("failed to encode {event}: {source}")]
    Encode {
        /// Event name being encoded.
        event: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// Static label for metrics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidEnvelope(_) => "invalid_envelope",
            Self::UnknownEvent(_) => "unknown_event",
            Self::InvalidPayload { .. } => "invalid_payload",
            Self::EmptyField { .. } => "empty_field",
            Self::FrameTooLarge { .. } => "frame_too_large",
            Self::Encode { .. } => "encode",
        }
    }
}
