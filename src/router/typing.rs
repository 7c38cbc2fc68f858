//! Typing indicator relay.
//!
//! Group indicators go to every member of the room, the sender's own
//! connections included. Clients filter their own echo.

use super::EventRouter;
use crate::state::DeliveryReport;
use chatter_proto::{
    DirectTyping, GroupTyping, ProtocolError, ServerEvent, TypingDirect, TypingGroup, UserId,
};

impl EventRouter {
    /// `typing:direct` -> the recipient's connections.
    pub fn relay_direct_typing(
        &self,
        from: UserId,
        typing: DirectTyping,
    ) -> Result<DeliveryReport, ProtocolError> {
        let event = ServerEvent::DirectTyping(TypingDirect {
            from,
            is_typing: typing.is_typing,
        });
        self.to_user(&typing.to, &event)
    }

    /// `typing:group` -> every connection in the room.
    pub fn relay_group_typing(
        &self,
        from: UserId,
        typing: GroupTyping,
    ) -> Result<DeliveryReport, ProtocolError> {
        let event = ServerEvent::GroupTyping(TypingGroup {
            group_id: typing.group_id.clone(),
            from,
            is_typing: typing.is_typing,
        });
        self.to_group(&typing.group_id, &event)
    }
}
