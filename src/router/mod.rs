//! Event Router - resolves targets to live connections and delivers.
//!
//! Every event is encoded once into a shared [`Frame`]. The target is
//! resolved to a snapshot of outbound queues under the hub's read lock, and
//! the frame is queued on each after the lock is released. Delivery is
//! best-effort and live-only: an unknown user or empty room is not an error,
//! it just reaches nobody.

mod signaling;
mod typing;

use crate::state::{DeliveryReport, Frame, Hub, Outbound};
use crate::telemetry::spans;
use chatter_proto::{
    DomainEvent, EventKind, GroupId, NotifyUser, ProtocolError, ServerEvent, Target, UserId,
};
use std::sync::Arc;
use tracing::debug;

/// Routes server events to users, user sets and group rooms.
#[derive(Clone)]
pub struct EventRouter {
    hub: Arc<Hub>,
}

impl EventRouter {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// Route a collaborator event to its target.
    pub fn publish(&self, event: &DomainEvent) -> Result<DeliveryReport, ProtocolError> {
        let _span = spans::route(event.kind.as_str(), event.target.label()).entered();
        self.route(&event.target, &event.to_server_event())
    }

    /// Deliver `event` to whatever `target` resolves to.
    pub fn route(
        &self,
        target: &Target,
        event: &ServerEvent,
    ) -> Result<DeliveryReport, ProtocolError> {
        match target {
            Target::User(user) => self.to_user(user, event),
            Target::Users(users) => self.to_users(users, event),
            Target::Group(group) => self.to_group(group, event),
        }
    }

    /// Deliver to every live connection of one user.
    pub fn to_user(
        &self,
        user: &UserId,
        event: &ServerEvent,
    ) -> Result<DeliveryReport, ProtocolError> {
        let recipients = self.hub.user_recipients(user);
        if recipients.is_empty() {
            debug!(event = event.name(), user = %user, "User has no live connections");
        }
        self.send(event, &recipients)
    }

    /// Deliver to the union of several users' connections, once per connection.
    pub fn to_users(
        &self,
        users: &[UserId],
        event: &ServerEvent,
    ) -> Result<DeliveryReport, ProtocolError> {
        let recipients = self.hub.users_recipients(users);
        if recipients.is_empty() {
            debug!(
                event = event.name(),
                users = users.len(),
                "No target user has a live connection"
            );
        }
        self.send(event, &recipients)
    }

    /// Deliver to every connection in a group's room.
    pub fn to_group(
        &self,
        group: &GroupId,
        event: &ServerEvent,
    ) -> Result<DeliveryReport, ProtocolError> {
        let recipients = self.hub.group_recipients(group);
        if recipients.is_empty() {
            debug!(event = event.name(), group = %group, "Room has no members");
        }
        self.send(event, &recipients)
    }

    /// Push a client-supplied notification to another user.
    pub fn notify_user(&self, notify: NotifyUser) -> Result<DeliveryReport, ProtocolError> {
        let event = ServerEvent::Domain {
            kind: EventKind::Notification,
            payload: notify.notification,
        };
        self.to_user(&notify.to, &event)
    }

    fn send(
        &self,
        event: &ServerEvent,
        recipients: &[Arc<Outbound>],
    ) -> Result<DeliveryReport, ProtocolError> {
        let frame = Frame::from(event.encode()?);
        let report = self.hub.deliver(&frame, recipients);
        crate::metrics::record_route(event.name(), report.delivered);
        Ok(report)
    }
}
