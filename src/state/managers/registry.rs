//! Connection registry: identity -> live connection handles.
//!
//! A user may hold several connections at once (tabs, devices). An identity
//! has an entry if and only if it has at least one handle, so the key set is
//! the presence set.

use crate::state::ConnId;
use chatter_proto::UserId;
use std::collections::BTreeMap;

/// Identity to ordered, duplicate-free handle list.
#[derive(Debug, Default)]
pub struct Registry {
    by_user: BTreeMap<UserId, Vec<ConnId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `conn` to `user`'s handles. Returns false if it was already there.
    pub fn register(&mut self, user: UserId, conn: ConnId) -> bool {
        let conns = self.by_user.entry(user).or_default();
        if conns.contains(&conn) {
            return false;
        }
        conns.push(conn);
        true
    }

    /// Remove `conn` from `user`'s handles, dropping the identity when none remain.
    ///
    /// Unknown identities and handles are a no-op. Returns whether anything changed.
    pub fn unregister(&mut self, user: &UserId, conn: &ConnId) -> bool {
        let Some(conns) = self.by_user.get_mut(user) else {
            return false;
        };
        let Some(pos) = conns.iter().position(|c| c == conn) else {
            return false;
        };
        conns.remove(pos);
        if conns.is_empty() {
            self.by_user.remove(user);
        }
        true
    }

    /// Handles for `user` in registration order; empty if unknown.
    pub fn connections_for(&self, user: &UserId) -> &[ConnId] {
        self.by_user.get(user).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every identity with at least one live handle, sorted.
    pub fn online_identities(&self) -> Vec<UserId> {
        self.by_user.keys().cloned().collect()
    }

    pub fn is_online(&self, user: &UserId) -> bool {
        self.by_user.contains_key(user)
    }

    pub fn online_count(&self) -> usize {
        self.by_user.len()
    }
}
