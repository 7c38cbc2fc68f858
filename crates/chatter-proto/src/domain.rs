//! Domain events handed over by request-handling collaborators.
//!
//! After persisting a message, reaction or notification, the collaborator
//! submits a [`DomainEvent`] naming who should see it. The realtime service
//! relays the payload verbatim and never inspects it.

use crate::ids::{GroupId, UserId};
use crate::server::ServerEvent;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Kinds of collaborator-originated events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A direct chat message was stored.
    #[serde(rename = "newMessage")]
    NewMessage,
    /// A reaction was added or removed.
    #[serde(rename = "messageReaction")]
    MessageReaction,
    /// A message was deleted.
    #[serde(rename = "messageDeleted")]
    MessageDeleted,
    /// A group chat message was stored.
    #[serde(rename = "group:message:new")]
    GroupMessage,
    /// A notification was created.
    #[serde(rename = "notification:new")]
    Notification,
}

impl EventKind {
    /// Every kind.
    pub const ALL: [EventKind; 5] = [
        Self::NewMessage,
        Self::MessageReaction,
        Self::MessageDeleted,
        Self::GroupMessage,
        Self::Notification,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewMessage => "newMessage",
            Self::MessageReaction => "messageReaction",
            Self::MessageDeleted => "messageDeleted",
            Self::GroupMessage => "group:message:new",
            Self::Notification => "notification:new",
        }
    }

    /// Look up a kind by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// Who an event is addressed to.
///
/// Serialized externally tagged: `{"user": "u1"}`, `{"users": ["u1","u2"]}`
/// or `{"group": "g1"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    /// Every live connection of one user.
    User(UserId),
    /// The union of several users' live connections.
    Users(Vec<UserId>),
    /// Every connection that joined the group's room.
    Group(GroupId),
}

impl Target {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Users(_) => "users",
            Self::Group(_) => "group",
        }
    }
}

/// A collaborator event: kind, addressee and opaque body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Event kind, which becomes the outbound event name.
    pub kind: EventKind,
    /// Addressee.
    pub target: Target,
    /// Body relayed verbatim.
    pub payload: Box<RawValue>,
}

impl DomainEvent {
    /// Build an event.
    pub fn new(kind: EventKind, target: Target, payload: Box<RawValue>) -> Self {
        Self {
            kind,
            target,
            payload,
        }
    }

    /// The outbound event recipients receive.
    pub fn to_server_event(&self) -> ServerEvent {
        ServerEvent::Domain {
            kind: self.kind,
            payload: self.payload.clone(),
        }
    }
}
