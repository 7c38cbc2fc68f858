//! Room membership handlers: `group:join`, `group:leave`.

use super::Context;
use crate::error::{HandlerError, HandlerResult};
use chatter_proto::GroupRef;
use tracing::debug;

pub(super) fn join(ctx: &Context<'_>, group: GroupRef) -> HandlerResult {
    let hub = ctx.router.hub();
    let group_id = group.group_id;
    if hub.join(group_id.clone(), ctx.conn) {
        debug!(conn = %ctx.conn, group = %group_id, "Joined room");
        Ok(())
    } else if hub.is_live(ctx.conn) {
        debug!(conn = %ctx.conn, group = %group_id, "Already in room");
        Ok(())
    } else {
        Err(HandlerError::NotConnected(ctx.conn.to_string()))
    }
}

pub(super) fn leave(ctx: &Context<'_>, group: GroupRef) -> HandlerResult {
    if ctx.router.hub().leave(&group.group_id, ctx.conn) {
        debug!(conn = %ctx.conn, group = %group.group_id, "Left room");
    }
    Ok(())
}
