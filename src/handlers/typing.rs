//! Typing indicator handlers.

use super::Context;
use crate::error::HandlerResult;
use chatter_proto::{DirectTyping, GroupTyping};

pub(super) fn direct(ctx: &Context<'_>, mut typing: DirectTyping) -> HandlerResult {
    let from = ctx.sender("typing:direct", typing.from.take())?;
    ctx.router.relay_direct_typing(from, typing)?;
    Ok(())
}

pub(super) fn group(ctx: &Context<'_>, mut typing: GroupTyping) -> HandlerResult {
    let from = ctx.sender("typing:group", typing.from.take())?;
    ctx.router.relay_group_typing(from, typing)?;
    Ok(())
}
