//! The Hub - shared realtime state.
//!
//! The Hub owns the live connection table, the identity registry and room
//! membership behind one [`RwLock`], so that a disconnect removes a handle
//! from all three in a single critical section. Network I/O never happens
//! under the lock: callers take a snapshot of recipients, release the lock
//! and then queue frames.

use super::conn_id::{ConnId, ConnIdGenerator};
use super::managers::presence::{PresenceAnnouncement, PresenceClock};
use super::managers::registry::Registry;
use super::managers::rooms::RoomTracker;
use super::outbound::{self, Frame, Mailbox, Outbound};
use crate::error::DeliveryError;
use chatter_proto::{GroupId, UserId};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// A freshly registered connection, handed to its connection task.
#[derive(Debug)]
pub struct Session {
    /// Server-assigned handle.
    pub conn: ConnId,
    /// Handshake identity, `None` when anonymous.
    pub user: Option<UserId>,
    /// Frames queued for this connection.
    pub mailbox: Mailbox,
    /// Cancelled when the hub drops this connection.
    pub closed: CancellationToken,
}

/// Outcome of delivering one event to a set of connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Connections the target resolved to.
    pub targeted: usize,
    /// Connections the frame was queued on.
    pub delivered: usize,
    /// Connections that could not take the frame and were dropped.
    pub failed: usize,
}

#[derive(Default)]
struct HubState {
    conns: HashMap<ConnId, Arc<Outbound>>,
    registry: Registry,
    rooms: RoomTracker,
    presence: PresenceClock,
}

impl HubState {
    fn announce(&mut self) -> Option<PresenceAnnouncement> {
        let online = self.registry.online_identities();
        let recipients = self.conns.values().cloned().collect();
        self.presence.announce(online, recipients)
    }

    fn refresh_gauges(&self) {
        crate::metrics::set_state_gauges(
            self.conns.len(),
            self.registry.online_count(),
            self.rooms.room_count(),
        );
    }
}

/// Shared realtime state.
pub struct Hub {
    state: RwLock<HubState>,
    conn_ids: ConnIdGenerator,
    sendq: usize,
}

impl Hub {
    /// Create an empty hub. `sendq` bounds each connection's outbound queue.
    pub fn new(node_id: &str, sendq: usize) -> Self {
        Self {
            state: RwLock::new(HubState::default()),
            conn_ids: ConnIdGenerator::new(node_id),
            sendq,
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Register a new live connection and announce presence to everyone.
    pub fn connect(&self, user: Option<UserId>) -> Session {
        let conn = self.conn_ids.next();
        let (outbound, mailbox, closed) = outbound::channel(conn.clone(), user.clone(), self.sendq);

        let announcement = {
            let mut state = self.state.write();
            state.conns.insert(conn.clone(), outbound);
            if let Some(ref user) = user {
                state.registry.register(user.clone(), conn.clone());
            }
            state.refresh_gauges();
            state.announce()
        };

        info!(conn = %conn, user = user.as_ref().map(UserId::as_str), "Connection registered");
        self.deliver_announcement(announcement);

        Session {
            conn,
            user,
            mailbox,
            closed,
        }
    }

    /// Remove a connection from the registry and every room, then announce.
    ///
    /// Safe to call any number of times; unknown handles are a no-op.
    /// Returns whether the connection was live.
    pub fn disconnect(&self, conn: &ConnId) -> bool {
        let removed = self.remove_and_announce(conn);
        if removed {
            info!(conn = %conn, "Connection unregistered");
        }
        removed
    }

    fn remove_and_announce(&self, conn: &ConnId) -> bool {
        let announcement = {
            let mut state = self.state.write();
            let Some(outbound) = state.conns.remove(conn) else {
                return false;
            };
            if let Some(user) = outbound.user() {
                state.registry.unregister(user, conn);
            }
            let left = state.rooms.leave_all(conn);
            if !left.is_empty() {
                debug!(conn = %conn, rooms = left.len(), "Left rooms on disconnect");
            }
            outbound.close();
            state.refresh_gauges();
            state.announce()
        };
        self.deliver_announcement(announcement);
        true
    }

    fn deliver_announcement(&self, announcement: Option<PresenceAnnouncement>) {
        if let Some(announcement) = announcement {
            let failed = announcement.deliver();
            self.drop_failed(failed);
        }
    }

    /// Disconnect connections whose queues rejected a frame.
    ///
    /// Each removal announces presence again, which may surface more failures;
    /// the worklist runs until none remain.
    fn drop_failed(&self, failed: Vec<(ConnId, DeliveryError)>) {
        let mut pending = failed;
        while let Some((conn, reason)) = pending.pop() {
            crate::metrics::record_delivery_failure(reason.reason());
            let announcement = {
                let mut state = self.state.write();
                let Some(outbound) = state.conns.remove(&conn) else {
                    continue;
                };
                if let Some(user) = outbound.user() {
                    state.registry.unregister(user, &conn);
                }
                state.rooms.leave_all(&conn);
                outbound.close();
                state.refresh_gauges();
                state.announce()
            };
            info!(conn = %conn, reason = %reason, "Dropping connection after delivery failure");
            if let Some(announcement) = announcement {
                pending.extend(announcement.deliver());
            }
        }
    }

    // ------------------------------------------------------------------
    // Rooms
    // ------------------------------------------------------------------

    /// Add a live connection to a group's room. Dead handles are ignored.
    pub fn join(&self, group: GroupId, conn: &ConnId) -> bool {
        let mut state = self.state.write();
        if !state.conns.contains_key(conn) {
            return false;
        }
        let joined = state.rooms.join(group, conn.clone());
        state.refresh_gauges();
        joined
    }

    /// Remove a connection from a group's room.
    pub fn leave(&self, group: &GroupId, conn: &ConnId) -> bool {
        let mut state = self.state.write();
        let left = state.rooms.leave(group, conn);
        state.refresh_gauges();
        left
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Every identity with at least one live connection, sorted.
    pub fn online_identities(&self) -> Vec<UserId> {
        self.state.read().registry.online_identities()
    }

    /// Live handles for `user` in connect order.
    pub fn connections_for(&self, user: &UserId) -> Vec<ConnId> {
        self.state.read().registry.connections_for(user).to_vec()
    }

    /// Handles that joined `group`.
    pub fn members_of(&self, group: &GroupId) -> Vec<ConnId> {
        self.state.read().rooms.members_of(group)
    }

    /// Groups `conn` has joined.
    pub fn rooms_of(&self, conn: &ConnId) -> Vec<GroupId> {
        self.state.read().rooms.rooms_of(conn)
    }

    pub fn is_online(&self, user: &UserId) -> bool {
        self.state.read().registry.is_online(user)
    }

    pub fn is_live(&self, conn: &ConnId) -> bool {
        self.state.read().conns.contains_key(conn)
    }

    pub fn connection_count(&self) -> usize {
        self.state.read().conns.len()
    }

    pub fn room_count(&self) -> usize {
        self.state.read().rooms.room_count()
    }

    /// Version of the most recent presence snapshot.
    pub fn presence_version(&self) -> u64 {
        self.state.read().presence.version()
    }

    // ------------------------------------------------------------------
    // Delivery
    // ------------------------------------------------------------------

    /// Snapshot the queues of every live connection of `user`.
    pub fn user_recipients(&self, user: &UserId) -> Vec<Arc<Outbound>> {
        let state = self.state.read();
        state
            .registry
            .connections_for(user)
            .iter()
            .filter_map(|c| state.conns.get(c).cloned())
            .collect()
    }

    /// Snapshot the queues of every live connection of any of `users`,
    /// each connection at most once.
    pub fn users_recipients(&self, users: &[UserId]) -> Vec<Arc<Outbound>> {
        let state = self.state.read();
        let mut seen = HashSet::new();
        users
            .iter()
            .flat_map(|u| state.registry.connections_for(u))
            .filter(|c| seen.insert((*c).clone()))
            .filter_map(|c| state.conns.get(c).cloned())
            .collect()
    }

    /// Snapshot the queues of every connection in `group`'s room.
    pub fn group_recipients(&self, group: &GroupId) -> Vec<Arc<Outbound>> {
        let state = self.state.read();
        state
            .rooms
            .members_of(group)
            .iter()
            .filter_map(|c| state.conns.get(c).cloned())
            .collect()
    }

    /// Queue `frame` on every recipient. Must be called without the lock held.
    ///
    /// A recipient that cannot take the frame is disconnected; the rest are
    /// still served.
    pub fn deliver(&self, frame: &Frame, recipients: &[Arc<Outbound>]) -> DeliveryReport {
        let mut report = DeliveryReport {
            targeted: recipients.len(),
            ..DeliveryReport::default()
        };
        let mut failed = Vec::new();
        for outbound in recipients {
            match outbound.send(frame) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    failed.push((outbound.conn().clone(), e));
                }
            }
        }
        if !failed.is_empty() {
            self.drop_failed(failed);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatter_proto::ServerEvent;

    fn hub() -> Hub {
        Hub::new("0RT", 16)
    }

    fn u(s: &str) -> UserId {
        UserId::from(s)
    }

    fn g(s: &str) -> GroupId {
        GroupId::from(s)
    }

    fn last_presence(session: &mut Session) -> Option<Vec<UserId>> {
        session
            .mailbox
            .drain()
            .into_iter()
            .filter_map(|f| match ServerEvent::decode(&f) {
                Ok(ServerEvent::OnlineUsers(ids)) => Some(ids),
                _ => None,
            })
            .last()
    }

    #[test]
    fn presence_scenario_with_two_devices() {
        let hub = hub();
        let a = hub.connect(Some(u("u1")));
        let b = hub.connect(Some(u("u1")));
        let mut c = hub.connect(Some(u("u2")));
        assert_eq!(hub.online_identities(), vec![u("u1"), u("u2")]);
        assert_eq!(hub.connections_for(&u("u1")), vec![a.conn.clone(), b.conn.clone()]);

        assert!(hub.disconnect(&a.conn));
        assert_eq!(hub.online_identities(), vec![u("u1"), u("u2")]);

        assert!(hub.disconnect(&b.conn));
        assert_eq!(hub.online_identities(), vec![u("u2")]);
        assert_eq!(last_presence(&mut c), Some(vec![u("u2")]));
    }

    #[test]
    fn every_mutation_announces_post_mutation_snapshot() {
        let hub = hub();
        let mut watcher = hub.connect(None);
        assert_eq!(last_presence(&mut watcher), Some(vec![]));

        let a = hub.connect(Some(u("u1")));
        assert_eq!(last_presence(&mut watcher), Some(vec![u("u1")]));

        hub.disconnect(&a.conn);
        assert_eq!(last_presence(&mut watcher), Some(vec![]));
        assert_eq!(hub.presence_version(), 3);
    }

    #[test]
    fn anonymous_connections_are_not_online() {
        let hub = hub();
        let anon = hub.connect(None);
        assert!(hub.online_identities().is_empty());
        assert!(hub.is_live(&anon.conn));
        assert_eq!(hub.connection_count(), 1);
    }

    #[test]
    fn disconnect_cleans_registry_and_rooms() {
        let hub = hub();
        let a = hub.connect(Some(u("u1")));
        assert!(hub.join(g("g1"), &a.conn));
        assert!(hub.join(g("g2"), &a.conn));
        assert_eq!(hub.rooms_of(&a.conn).len(), 2);

        hub.disconnect(&a.conn);
        assert!(hub.connections_for(&u("u1")).is_empty());
        assert!(hub.members_of(&g("g1")).is_empty());
        assert!(hub.members_of(&g("g2")).is_empty());
        assert_eq!(hub.room_count(), 0);
        assert!(a.closed.is_cancelled());
    }

    #[test]
    fn double_disconnect_is_noop() {
        let hub = hub();
        let a = hub.connect(Some(u("u1")));
        assert!(hub.disconnect(&a.conn));
        let version = hub.presence_version();
        assert!(!hub.disconnect(&a.conn));
        assert!(!hub.disconnect(&ConnId::from("0RTZZZZZZ")));
        assert_eq!(hub.presence_version(), version);
    }

    #[test]
    fn dead_connection_cannot_join() {
        let hub = hub();
        let a = hub.connect(None);
        hub.disconnect(&a.conn);
        assert!(!hub.join(g("g1"), &a.conn));
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn users_recipients_are_deduplicated() {
        let hub = hub();
        let _a = hub.connect(Some(u("u1")));
        let _b = hub.connect(Some(u("u2")));
        let recipients = hub.users_recipients(&[u("u1"), u("u2"), u("u1"), u("ghost")]);
        assert_eq!(recipients.len(), 2);
    }

    #[test]
    fn full_queue_disconnects_only_that_connection() {
        let hub = Hub::new("0RT", 2);
        let stuck = hub.connect(Some(u("slow")));
        let mut fine = hub.connect(Some(u("fast")));

        // stuck never drains, so its queue fills with frames.
        let frame = Frame::from(r#"{"event":"newMessage","data":{}}"#);
        let mut dropped = false;
        for _ in 0..4 {
            let recipients = hub.user_recipients(&u("slow"));
            if recipients.is_empty() {
                dropped = true;
                break;
            }
            hub.deliver(&frame, &recipients);
        }
        assert!(dropped);
        assert!(!hub.is_live(&stuck.conn));
        assert!(stuck.closed.is_cancelled());
        assert!(hub.is_live(&fine.conn));
        assert_eq!(hub.online_identities(), vec![u("fast")]);
        assert_eq!(last_presence(&mut fine), Some(vec![u("fast")]));
    }

    #[test]
    fn connect_burst_beyond_sendq_evicts_nobody() {
        let hub = Hub::new("0RT", 4);
        let sessions: Vec<Session> = (0..40)
            .map(|i| hub.connect(Some(u(&format!("u{i}")))))
            .collect();

        assert_eq!(hub.connection_count(), 40);
        assert_eq!(hub.online_identities().len(), 40);
        assert!(sessions.iter().all(|s| !s.closed.is_cancelled()));

        // The earliest connection sees one up-to-date snapshot.
        let mut first = sessions.into_iter().next().unwrap();
        let frames = first.mailbox.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(last_presence_of(&frames).map(|ids| ids.len()), Some(40));
    }

    fn last_presence_of(frames: &[Frame]) -> Option<Vec<UserId>> {
        frames.iter().rev().find_map(|f| match ServerEvent::decode(f) {
            Ok(ServerEvent::OnlineUsers(ids)) => Some(ids),
            _ => None,
        })
    }
}
