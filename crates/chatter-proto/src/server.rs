//! Server-originated events.

use crate::domain::EventKind;
use crate::envelope::{self, Envelope, payload};
use crate::error::ProtocolError;
use crate::ids::{GroupId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Wire name of the presence snapshot event.
pub const ONLINE_USERS: &str = "getOnlineUsers";
/// Wire name of an incoming call.
pub const CALL_INCOMING: &str = "call:incoming";
/// Wire name of a relayed answer.
pub const CALL_ANSWER: &str = "call:answer";
/// Wire name of a relayed ICE candidate.
pub const CALL_ICE_CANDIDATE: &str = "call:ice-candidate";
/// Wire name of a relayed hang-up.
pub const CALL_END: &str = "call:end";
/// Wire name of a direct typing indicator.
pub const TYPING_DIRECT: &str = "typing:direct";
/// Wire name of a group typing indicator.
pub const TYPING_GROUP: &str = "typing:group";

/// `call:incoming`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingCall {
    /// Caller.
    pub from: UserId,
    /// The caller's offer, untouched.
    pub offer: Box<RawValue>,
}

/// `call:answer`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAnswered {
    /// Callee that answered, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
    /// The callee's answer, untouched.
    pub answer: Box<RawValue>,
}

/// `call:ice-candidate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IceRelay {
    /// Peer that produced the candidate, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
    /// The candidate, untouched.
    pub candidate: Box<RawValue>,
}

/// `call:end`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEnded {
    /// Peer that hung up, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<UserId>,
}

/// `typing:direct`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingDirect {
    /// Who is typing.
    pub from: UserId,
    /// Typing state.
    pub is_typing: bool,
}

/// `typing:group`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingGroup {
    /// Group the indicator belongs to.
    pub group_id: GroupId,
    /// Who is typing.
    pub from: UserId,
    /// Typing state.
    pub is_typing: bool,
}

/// Every event the server emits.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// `getOnlineUsers` - full presence snapshot.
    OnlineUsers(Vec<UserId>),
    /// Collaborator-originated event relayed verbatim.
    Domain {
        /// Which domain event this is.
        kind: EventKind,
        /// Opaque body.
        payload: Box<RawValue>,
    },
    /// `call:incoming`
    CallIncoming(IncomingCall),
    /// `call:answer`
    CallAnswer(CallAnswered),
    /// `call:ice-candidate`
    IceCandidate(IceRelay),
    /// `call:end`
    CallEnd(CallEnded),
    /// `typing:direct`
    DirectTyping(TypingDirect),
    /// `typing:group`
    GroupTyping(TypingGroup),
}

impl ServerEvent {
    /// Wire name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OnlineUsers(_) => ONLINE_USERS,
            Self::Domain { kind, .. } => kind.as_str(),
            Self::CallIncoming(_) => CALL_INCOMING,
            Self::CallAnswer(_) => CALL_ANSWER,
            Self::IceCandidate(_) => CALL_ICE_CANDIDATE,
            Self::CallEnd(_) => CALL_END,
            Self::DirectTyping(_) => TYPING_DIRECT,
            Self::GroupTyping(_) => TYPING_GROUP,
        }
    }

    /// Encode as a frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        let name = self.name();
        match self {
            Self::OnlineUsers(ids) => envelope::encode(name, ids),
            Self::Domain { payload, .. } => envelope::encode(name, payload),
            Self::CallIncoming(e) => envelope::encode(name, e),
            Self::CallAnswer(e) => envelope::encode(name, e),
            Self::IceCandidate(e) => envelope::encode(name, e),
            Self::CallEnd(e) => envelope::encode(name, e),
            Self::DirectTyping(e) => envelope::encode(name, e),
            Self::GroupTyping(e) => envelope::encode(name, e),
        }
    }

    /// Decode a frame. Used by clients and tests.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let env = Envelope::parse(text)?;
        let data = env.data_str();
        let event = match &*env.event {
            ONLINE_USERS => Self::OnlineUsers(payload(ONLINE_USERS, data)?),
            CALL_INCOMING => Self::CallIncoming(payload(CALL_INCOMING, data)?),
            CALL_ANSWER => Self::CallAnswer(payload(CALL_ANSWER, data)?),
            CALL_ICE_CANDIDATE => Self::IceCandidate(payload(CALL_ICE_CANDIDATE, data)?),
            CALL_END if data == "null" => Self::CallEnd(CallEnded::default()),
            CALL_END => Self::CallEnd(payload(CALL_END, data)?),
            TYPING_DIRECT => Self::DirectTyping(payload(TYPING_DIRECT, data)?),
            TYPING_GROUP => Self::GroupTyping(payload(TYPING_GROUP, data)?),
            other => {
                let kind = EventKind::from_name(other)
                    .ok_or_else(|| ProtocolError::UnknownEvent(other.to_string()))?;
                Self::Domain {
                    kind,
                    payload: payload(kind.as_str(), data)?,
                }
            }
        };
        Ok(event)
    }
}
