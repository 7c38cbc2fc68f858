//! The `{"event", "data"}` frame envelope.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::borrow::Cow;

/// Default upper bound for a single inbound frame.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// A decoded envelope that borrows from the frame text.
///
/// `data` is left undecoded so each event can parse its own payload shape.
#[derive(Debug, Deserialize)]
pub struct Envelope<'a> {
    /// Event name.
    #[serde(borrow)]
    pub event: Cow<'a, str>,
    /// Raw event body, if any.
    #[serde(borrow, default)]
    pub data: Option<&'a RawValue>,
}

impl<'a> Envelope<'a> {
    /// Parse an envelope from frame text.
    pub fn parse(text: &'a str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::InvalidEnvelope)
    }

    /// Parse an envelope, refusing frames longer than `max` bytes.
    pub fn parse_bounded(text: &'a str, max: usize) -> Result<Self, ProtocolError> {
        if text.len() > max {
            return Err(ProtocolError::FrameTooLarge {
                len: text.len(),
                max,
            });
        }
        Self::parse(text)
    }

    /// The body text, `null` when absent.
    pub fn data_str(&self) -> &str {
        self.data.map(RawValue::get).unwrap_or("null")
    }
}

#[derive(Serialize)]
struct EnvelopeOut<'a, T: Serialize + ?Sized> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
}

/// Encode an event with a body.
pub fn encode<T: Serialize + ?Sized>(
    event: &'static str,
    data: &T,
) -> Result<String, ProtocolError> {
    serde_json::to_string(&EnvelopeOut {
        event,
        data: Some(data),
    })
    .map_err(|source| ProtocolError::Encode { event, source })
}

/// Encode an event without a body.
pub fn encode_bare(event: &'static str) -> Result<String, ProtocolError> {
    serde_json::to_string(&EnvelopeOut::<()> { event, data: None })
        .map_err(|source| ProtocolError::Encode { event, source })
}

/// Decode `data` into a typed payload for `event`.
pub(crate) fn payload<T: serde::de::DeserializeOwned>(
    event: &'static str,
    data: &str,
) -> Result<T, ProtocolError> {
    serde_json::from_str(data).map_err(|source| ProtocolError::InvalidPayload { event, source })
}
