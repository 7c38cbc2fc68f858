//! Call signaling relay.
//!
//! Offers, answers, ICE candidates and hang-ups are forwarded to the peer's
//! live connections as-is. No call state is kept: out-of-order or duplicate
//! messages are forwarded like any other, and the opaque session payloads are
//! never re-serialized.

use super::EventRouter;
use crate::state::DeliveryReport;
use chatter_proto::{
    CallAnswer, CallAnswered, CallEnd, CallEnded, CallUser, IceCandidate, IceRelay, IncomingCall,
    ProtocolError, ServerEvent, UserId,
};

impl EventRouter {
    /// `call:user` -> `call:incoming` on the callee.
    pub fn relay_offer(
        &self,
        from: UserId,
        call: CallUser,
    ) -> Result<DeliveryReport, ProtocolError> {
        let event = ServerEvent::CallIncoming(IncomingCall {
            from,
            offer: call.offer,
        });
        self.to_user(&call.to, &event)
    }

    /// `call:answer` -> `call:answer` on the caller.
    pub fn relay_answer(
        &self,
        from: Option<UserId>,
        answer: CallAnswer,
    ) -> Result<DeliveryReport, ProtocolError> {
        let event = ServerEvent::CallAnswer(CallAnswered {
            from,
            answer: answer.answer,
        });
        self.to_user(&answer.to, &event)
    }

    /// `call:ice-candidate` -> `call:ice-candidate` on the peer.
    pub fn relay_ice_candidate(
        &self,
        from: Option<UserId>,
        candidate: IceCandidate,
    ) -> Result<DeliveryReport, ProtocolError> {
        let event = ServerEvent::IceCandidate(IceRelay {
            from,
            candidate: candidate.candidate,
        });
        self.to_user(&candidate.to, &event)
    }

    /// `call:end` -> `call:end` on the peer.
    pub fn relay_hangup(
        &self,
        from: Option<UserId>,
        end: CallEnd,
    ) -> Result<DeliveryReport, ProtocolError> {
        self.to_user(&end.to, &ServerEvent::CallEnd(CallEnded { from }))
    }
}
