//! Room membership: group -> joined connections.
//!
//! Rooms are keyed by connection, not identity. A reverse index lets
//! disconnect drop a handle from every room it joined without scanning all
//! groups.

use crate::state::ConnId;
use chatter_proto::GroupId;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct RoomTracker {
    members: HashMap<GroupId, HashSet<ConnId>>,
    joined: HashMap<ConnId, HashSet<GroupId>>,
}

impl RoomTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `conn` to `group`. Returns false if it was already a member.
    pub fn join(&mut self, group: GroupId, conn: ConnId) -> bool {
        let added = self
            .members
            .entry(group.clone())
            .or_default()
            .insert(conn.clone());
        if added {
            self.joined.entry(conn).or_default().insert(group);
        }
        added
    }

    /// Remove `conn` from `group`. Empty rooms are dropped.
    pub fn leave(&mut self, group: &GroupId, conn: &ConnId) -> bool {
        let Some(members) = self.members.get_mut(group) else {
            return false;
        };
        if !members.remove(conn) {
            return false;
        }
        if members.is_empty() {
            self.members.remove(group);
        }
        if let Some(groups) = self.joined.get_mut(conn) {
            groups.remove(group);
            if groups.is_empty() {
                self.joined.remove(conn);
            }
        }
        true
    }

    /// Remove `conn` from every room. Returns the groups it left.
    pub fn leave_all(&mut self, conn: &ConnId) -> Vec<GroupId> {
        let Some(groups) = self.joined.remove(conn) else {
            return Vec::new();
        };
        for group in &groups {
            if let Some(members) = self.members.get_mut(group) {
                members.remove(conn);
                if members.is_empty() {
                    self.members.remove(group);
                }
            }
        }
        groups.into_iter().collect()
    }

    /// Connections currently in `group`.
    pub fn members_of(&self, group: &GroupId) -> Vec<ConnId> {
        self.members
            .get(group)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Groups `conn` has joined.
    pub fn rooms_of(&self, conn: &ConnId) -> Vec<GroupId> {
        self.joined
            .get(conn)
            .map(|g| g.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_member(&self, group: &GroupId, conn: &ConnId) -> bool {
        self.members.get(group).is_some_and(|m| m.contains(conn))
    }

    pub fn room_count(&self) -> usize {
        self.members.len()
    }
}
