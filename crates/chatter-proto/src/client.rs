//! Client-originated events.

use crate::envelope::{self, Envelope, payload};
use crate::error::ProtocolError;
use crate::ids::{GroupId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Names of every event a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientEventKind {
    /// `call:user`
    CallUser,
    /// `call:answer`
    CallAnswer,
    /// `call:ice-candidate`
    IceCandidate,
    /// `call:end`
    CallEnd,
    /// `typing:direct`
    DirectTyping,
    /// `typing:group`
    GroupTyping,
    /// `group:join`
    GroupJoin,
    /// `group:leave`
    GroupLeave,
    /// `notify:user`
    NotifyUser,
}

impl ClientEventKind {
    /// Every kind, in wire-table order.
    pub const ALL: [ClientEventKind; 9] = [
        Self::CallUser,
        Self::CallAnswer,
        Self::IceCandidate,
        Self::CallEnd,
        Self::DirectTyping,
        Self::GroupTyping,
        Self::GroupJoin,
        Self::GroupLeave,
        Self::NotifyUser,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CallUser => "call:user",
            Self::CallAnswer => "call:answer",
            Self::IceCandidate => "call:ice-candidate",
            Self::CallEnd => "call:end",
            Self::DirectTyping => "typing:direct",
            Self::GroupTyping => "typing:group",
            Self::GroupJoin => "group:join",
            Self::GroupLeave => "group:leave",
            Self::NotifyUser => "notify:user",
        }
    }

    /// Look up a kind by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

/// `call:user` - start a call by sending an offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallUser {
    /// Callee.
    pub to: UserId,
    /// Opaque session offer.
    pub offer: Box<RawValue>,
    /// Caller, only honoured for anonymous connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
}

/// `call:answer` - accept a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAnswer {
    /// The caller being answered.
    pub to: UserId,
    /// Opaque session answer.
    pub answer: Box<RawValue>,
}

/// `call:ice-candidate` - trickle a connectivity candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceCandidate {
    /// Peer.
    pub to: UserId,
    /// Opaque candidate.
    pub candidate: Box<RawValue>,
}

/// `call:end` - hang up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEnd {
    /// Peer.
    pub to: UserId,
}

/// `typing:direct`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectTyping {
    /// Recipient.
    pub to: UserId,
    /// Whether the sender is currently typing.
    pub is_typing: bool,
    /// Sender, only honoured for anonymous connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
}

/// `typing:group`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupTyping {
    /// Group whose room receives the indicator.
    pub group_id: GroupId,
    /// Whether the sender is currently typing.
    pub is_typing: bool,
    /// Sender, only honoured for anonymous connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
}

/// `group:join` / `group:leave`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRef {
    /// Target group.
    #[serde(alias = "group")]
    pub group_id: GroupId,
}

/// `notify:user` - push a notification to another user's live connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyUser {
    /// Recipient.
    pub to: UserId,
    /// Opaque notification body.
    pub notification: Box<RawValue>,
}

/// Every event a client may send.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// `call:user`
    CallUser(CallUser),
    /// `call:answer`
    CallAnswer(CallAnswer),
    /// `call:ice-candidate`
    IceCandidate(IceCandidate),
    /// `call:end`
    CallEnd(CallEnd),
    /// `typing:direct`
    DirectTyping(DirectTyping),
    /// `typing:group`
    GroupTyping(GroupTyping),
    /// `group:join`
    GroupJoin(GroupRef),
    /// `group:leave`
    GroupLeave(GroupRef),
    /// `notify:user`
    NotifyUser(NotifyUser),
}

fn require(event: &'static str, field: &'static str, empty: bool) -> Result<(), ProtocolError> {
    if empty {
        Err(ProtocolError::EmptyField { event, field })
    } else {
        Ok(())
    }
}

impl ClientEvent {
    /// Kind of this event.
    pub fn kind(&self) -> ClientEventKind {
        match self {
            Self::CallUser(_) => ClientEventKind::CallUser,
            Self::CallAnswer(_) => ClientEventKind::CallAnswer,
            Self::IceCandidate(_) => ClientEventKind::IceCandidate,
            Self::CallEnd(_) => ClientEventKind::CallEnd,
            Self::DirectTyping(_) => ClientEventKind::DirectTyping,
            Self::GroupTyping(_) => ClientEventKind::GroupTyping,
            Self::GroupJoin(_) => ClientEventKind::GroupJoin,
            Self::GroupLeave(_) => ClientEventKind::GroupLeave,
            Self::NotifyUser(_) => ClientEventKind::NotifyUser,
        }
    }

    /// Decode a frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Self::from_envelope(&Envelope::parse(text)?)
    }

    /// Decode a frame, refusing anything longer than `max` bytes.
    pub fn decode_bounded(text: &str, max: usize) -> Result<Self, ProtocolError> {
        Self::from_envelope(&Envelope::parse_bounded(text, max)?)
    }

    /// Decode the payload of an already-parsed envelope.
    pub fn from_envelope(env: &Envelope<'_>) -> Result<Self, ProtocolError> {
        let kind = ClientEventKind::from_name(&env.event)
            .ok_or_else(|| ProtocolError::UnknownEvent(env.event.to_string()))?;
        let name = kind.as_str();
        let data = env.data_str();

        let event = match kind {
            ClientEventKind::CallUser => Self::CallUser(payload(name, data)?),
            ClientEventKind::CallAnswer => Self::CallAnswer(payload(name, data)?),
            ClientEventKind::IceCandidate => Self::IceCandidate(payload(name, data)?),
            ClientEventKind::CallEnd => Self::CallEnd(payload(name, data)?),
            ClientEventKind::DirectTyping => Self::DirectTyping(payload(name, data)?),
            ClientEventKind::GroupTyping => Self::GroupTyping(payload(name, data)?),
            ClientEventKind::GroupJoin => Self::GroupJoin(payload(name, data)?),
            ClientEventKind::GroupLeave => Self::GroupLeave(payload(name, data)?),
            ClientEventKind::NotifyUser => Self::NotifyUser(payload(name, data)?),
        };
        event.check_addressing()?;
        Ok(event)
    }

    fn check_addressing(&self) -> Result<(), ProtocolError> {
        let name = self.kind().as_str();
        match self {
            Self::CallUser(e) => require(name, "to", e.to.is_empty()),
            Self::CallAnswer(e) => require(name, "to", e.to.is_empty()),
            Self::IceCandidate(e) => require(name, "to", e.to.is_empty()),
            Self::CallEnd(e) => require(name, "to", e.to.is_empty()),
            Self::DirectTyping(e) => require(name, "to", e.to.is_empty()),
            Self::NotifyUser(e) => require(name, "to", e.to.is_empty()),
            Self::GroupTyping(e) => require(name, "groupId", e.group_id.is_empty()),
            Self::GroupJoin(e) | Self::GroupLeave(e) => {
                require(name, "groupId", e.group_id.is_empty())
            }
        }
    }

    /// Encode as a frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let name = self.kind().as_str();
        match self {
            Self::CallUser(e) => envelope::encode(name, e),
            Self::CallAnswer(e) => envelope::encode(name, e),
            Self::IceCandidate(e) => envelope::encode(name, e),
            Self::CallEnd(e) => envelope::encode(name, e),
            Self::DirectTyping(e) => envelope::encode(name, e),
            Self::GroupTyping(e) => envelope::encode(name, e),
            Self::GroupJoin(e) | Self::GroupLeave(e) => envelope::encode(name, e),
            Self::NotifyUser(e) => envelope::encode(name, e),
        }
    }
}
