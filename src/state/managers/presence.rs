//! Presence broadcaster.
//!
//! Every registry change produces a full `getOnlineUsers` snapshot addressed
//! to every live connection. The snapshot and its recipient list are taken
//! under the hub lock; [`PresenceAnnouncement::deliver`] runs after the lock
//! is released. Snapshots carry a version so a connection that receives two
//! announcements out of order keeps the newer one. Snapshots never occupy
//! the bounded frame queue, so a burst of announcements cannot evict anyone.

use crate::error::DeliveryError;
use crate::state::ConnId;
use crate::state::outbound::{Frame, Outbound};
use chatter_proto::{ServerEvent, UserId};
use std::sync::Arc;
use tracing::{debug, error};

/// Monotonic version source for snapshots. Lives inside the hub lock.
#[derive(Debug, Default)]
pub struct PresenceClock {
    version: u64,
}

impl PresenceClock {
    /// Build the next announcement.
    ///
    /// Returns `None` only if the snapshot cannot be encoded.
    pub fn announce(
        &mut self,
        online: Vec<UserId>,
        recipients: Vec<Arc<Outbound>>,
    ) -> Option<PresenceAnnouncement> {
        let online_count = online.len();
        let frame = match ServerEvent::OnlineUsers(online).encode() {
            Ok(text) => Frame::from(text),
            Err(e) => {
                error!(error = %e, "Failed to encode presence snapshot");
                return None;
            }
        };
        self.version += 1;
        Some(PresenceAnnouncement {
            version: self.version,
            online_count,
            frame,
            recipients,
        })
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

/// A snapshot ready to be queued on every recipient.
#[derive(Debug)]
pub struct PresenceAnnouncement {
    version: u64,
    online_count: usize,
    frame: Frame,
    recipients: Vec<Arc<Outbound>>,
}

impl PresenceAnnouncement {
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Queue the snapshot on every recipient.
    ///
    /// A failed recipient does not stop the loop. Returns the handles that
    /// could not be reached, for the caller to disconnect.
    pub fn deliver(self) -> Vec<(ConnId, DeliveryError)> {
        crate::metrics::record_presence_announcement();
        debug!(
            version = self.version,
            online = self.online_count,
            recipients = self.recipients.len(),
            "Announcing presence"
        );
        let mut failed = Vec::new();
        for outbound in &self.recipients {
            if let Err(e) = outbound.send_presence(self.version, &self.frame) {
                failed.push((outbound.conn().clone(), e));
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::outbound;

    #[test]
    fn versions_increase_and_snapshot_is_full() {
        let (a, mut mailbox, _) = outbound::channel(ConnId::from("A"), None, 4);
        let mut clock = PresenceClock::default();

        let first = clock
            .announce(vec![UserId::from("u1")], vec![Arc::clone(&a)])
            .unwrap();
        let second = clock
            .announce(
                vec![UserId::from("u1"), UserId::from("u2")],
                vec![Arc::clone(&a)],
            )
            .unwrap();
        assert_eq!(first.version(), 1);
        assert_eq!(second.version(), 2);
        assert_eq!(clock.version(), 2);

        // Delivered out of order: the older snapshot is discarded.
        assert!(second.deliver().is_empty());
        assert!(first.deliver().is_empty());

        let frames = mailbox.drain();
        assert_eq!(frames.len(), 1);
        assert_eq!(
            &*frames[0],
            r#"{"event":"getOnlineUsers","data":["u1","u2"]}"#
        );
    }

    #[test]
    fn failed_recipients_are_reported_and_others_still_served() {
        let (gone, gone_box, _) = outbound::channel(ConnId::from("G"), None, 1);
        let (full, mut full_box, _) = outbound::channel(ConnId::from("F"), None, 1);
        let (ok, mut ok_box, _) = outbound::channel(ConnId::from("O"), None, 4);
        drop(gone_box);
        full.send(&Frame::from("filler")).unwrap();

        let mut clock = PresenceClock::default();
        let announcement = clock
            .announce(Vec::new(), vec![gone, Arc::clone(&full), Arc::clone(&ok)])
            .unwrap();
        let failed = announcement.deliver();

        // A full frame queue still takes the snapshot.
        assert_eq!(failed, vec![(ConnId::from("G"), DeliveryError::Closed)]);
        assert_eq!(full_box.drain().len(), 2);
        assert_eq!(ok_box.drain().len(), 1);
    }
}
