//! Client event handlers.
//!
//! Each inbound text frame is decoded into one [`ClientEvent`] and dispatched
//! by kind. Handlers never reply to the sender: errors are counted and handed
//! back to the connection loop, which logs them and moves on.

mod call;
mod group;
mod notify;
mod typing;

use crate::error::{HandlerError, HandlerResult};
use crate::router::EventRouter;
use crate::state::ConnId;
use crate::telemetry::EventTimer;
use chatter_proto::{ClientEvent, UserId};

/// Per-frame handler context.
pub struct Context<'a> {
    /// Handle of the connection the frame arrived on.
    pub conn: &'a ConnId,
    /// Handshake identity, `None` when anonymous.
    pub user: Option<&'a UserId>,
    pub router: &'a EventRouter,
}

impl Context<'_> {
    /// Resolve the sender of a relayed event.
    ///
    /// The handshake identity always wins. An anonymous connection may name
    /// itself in the payload; if it does not, the event is malformed.
    fn sender(&self, event: &'static str, supplied: Option<UserId>) -> HandlerResult<UserId> {
        if let Some(user) = self.user {
            return Ok(user.clone());
        }
        supplied
            .filter(|u| !u.is_empty())
            .ok_or(HandlerError::MissingSender { event })
    }

    /// Sender for events where naming one is optional.
    fn optional_sender(&self) -> Option<UserId> {
        self.user.cloned()
    }
}

/// Decode and handle one inbound text frame.
pub fn handle_frame(ctx: &Context<'_>, text: &str, max_frame_bytes: usize) -> HandlerResult {
    let event = match ClientEvent::decode_bounded(text, max_frame_bytes) {
        Ok(event) => event,
        Err(e) => {
            crate::metrics::record_event_error("invalid", e.code());
            return Err(e.into());
        }
    };
    dispatch(ctx, event)
}

/// Handle one decoded client event.
pub fn dispatch(ctx: &Context<'_>, event: ClientEvent) -> HandlerResult {
    let name = event.kind().as_str();
    let _timer = EventTimer::new(name);

    let result = match event {
        ClientEvent::CallUser(e) => call::offer(ctx, e),
        ClientEvent::CallAnswer(e) => call::answer(ctx, e),
        ClientEvent::IceCandidate(e) => call::ice_candidate(ctx, e),
        ClientEvent::CallEnd(e) => call::hangup(ctx, e),
        ClientEvent::DirectTyping(e) => typing::direct(ctx, e),
        ClientEvent::GroupTyping(e) => typing::group(ctx, e),
        ClientEvent::GroupJoin(e) => group::join(ctx, e),
        ClientEvent::GroupLeave(e) => group::leave(ctx, e),
        ClientEvent::NotifyUser(e) => notify::notify_user(ctx, e),
    };

    if let Err(ref e) = result {
        crate::metrics::record_event_error(name, e.error_code());
    }
    result
}
