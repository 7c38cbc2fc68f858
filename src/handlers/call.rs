//! Call signaling handlers: `call:user`, `call:answer`, `call:ice-candidate`, `call:end`.

use super::Context;
use crate::error::HandlerResult;
use chatter_proto::{CallAnswer, CallEnd, CallUser, IceCandidate};
use tracing::debug;

pub(super) fn offer(ctx: &Context<'_>, mut call: CallUser) -> HandlerResult {
    let from = ctx.sender("call:user", call.from.take())?;
    debug!(conn = %ctx.conn, from = %from, to = %call.to, "Relaying call offer");
    ctx.router.relay_offer(from, call)?;
    Ok(())
}

pub(super) fn answer(ctx: &Context<'_>, answer: CallAnswer) -> HandlerResult {
    debug!(conn = %ctx.conn, to = %answer.to, "Relaying call answer");
    ctx.router.relay_answer(ctx.optional_sender(), answer)?;
    Ok(())
}

pub(super) fn ice_candidate(ctx: &Context<'_>, candidate: IceCandidate) -> HandlerResult {
    ctx.router
        .relay_ice_candidate(ctx.optional_sender(), candidate)?;
    Ok(())
}

pub(super) fn hangup(ctx: &Context<'_>, end: CallEnd) -> HandlerResult {
    debug!(conn = %ctx.conn, to = %end.to, "Relaying hang-up");
    ctx.router.relay_hangup(ctx.optional_sender(), end)?;
    Ok(())
}
