//! `notify:user` handler.

use super::Context;
use crate::error::HandlerResult;
use chatter_proto::NotifyUser;
use tracing::debug;

pub(super) fn notify_user(ctx: &Context<'_>, notify: NotifyUser) -> HandlerResult {
    let to = notify.to.clone();
    let report = ctx.router.notify_user(notify)?;
    debug!(conn = %ctx.conn, to = %to, delivered = report.delivered, "Notification pushed");
    Ok(())
}
