//! # chatter-proto
//!
//! Wire protocol for the chatter realtime service.
//!
//! Every WebSocket text frame carries one JSON envelope:
//!
//! ```json
//! {"event": "call:user", "data": {"to": "u2", "offer": {"sdp": "..."}}}
//! ```
//!
//! The set of events is closed in both directions. [`ClientEvent`] lists what
//! a client may send, [`ServerEvent`] lists what the server emits. Anything
//! else is rejected at decode time with a [`ProtocolError`].
//!
//! Opaque payloads (call offers, ICE candidates, chat messages handed over by
//! collaborators) are carried as [`serde_json::value::RawValue`], so the bytes a
//! sender wrote are the bytes a recipient reads.
//!
//! ## Quick Start
//!
//! ```rust
//! use chatter_proto::{ClientEvent, UserId};
//!
//! let raw = r#"{"event":"call:end","data":{"to":"u2"}}"#;
//! match ClientEvent::decode(raw).expect("valid event") {
//!     ClientEvent::CallEnd(end) => assert_eq!(end.to, UserId::from("u2")),
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod client;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod handshake;
pub mod ids;
pub mod server;

pub use client::{
    CallAnswer, CallEnd, CallUser, ClientEvent, ClientEventKind, DirectTyping, GroupRef,
    GroupTyping, IceCandidate, NotifyUser,
};
pub use domain::{DomainEvent, EventKind, Target};
pub use envelope::{Envelope, DEFAULT_MAX_FRAME_BYTES};
pub use error::ProtocolError;
pub use ids::{GroupId, UserId};
pub use server::{
    CallAnswered, CallEnded, IceRelay, IncomingCall, ServerEvent, TypingDirect, TypingGroup,
};

/// Re-exported so downstream crates name the same raw payload type.
pub use serde_json::value::RawValue;
