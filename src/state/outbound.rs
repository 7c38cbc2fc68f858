//! Per-connection outbound queue.
//!
//! Every live connection owns a bounded queue drained by its writer. The
//! sending half ([`Outbound`]) lives in the hub and is cloned into delivery
//! snapshots; the receiving half ([`Mailbox`]) belongs to the connection task.
//!
//! Queuing never blocks. A full or closed queue is reported to the caller as a
//! [`DeliveryError`] and the connection is then torn down by the hub.
//!
//! Presence snapshots bypass the bounded queue. Each connection has a single
//! `watch` slot holding the newest snapshot, so any number of announcements
//! costs one slot and can never fill the queue.

use super::conn_id::ConnId;
use crate::error::DeliveryError;
use chatter_proto::UserId;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// An encoded text frame, shared by every recipient of the same event.
pub type Frame = Arc<str>;

/// Newest presence snapshot and its version.
type PresenceSlot = Option<(u64, Frame)>;

/// Sending half of a connection's queue.
#[derive(Debug)]
pub struct Outbound {
    conn: ConnId,
    user: Option<UserId>,
    tx: mpsc::Sender<Frame>,
    presence: watch::Sender<PresenceSlot>,
    closed: CancellationToken,
}

impl Outbound {
    /// Handle of the connection this queue feeds.
    pub fn conn(&self) -> &ConnId {
        &self.conn
    }

    /// Handshake identity, `None` for anonymous connections.
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    /// Queue a frame without waiting.
    pub fn send(&self, frame: &Frame) -> Result<(), DeliveryError> {
        self.tx.try_send(Arc::clone(frame))?;
        Ok(())
    }

    /// Replace the pending presence snapshot unless a newer one is already
    /// there. Only fails once the mailbox is gone.
    pub(crate) fn send_presence(&self, version: u64, frame: &Frame) -> Result<(), DeliveryError> {
        if self.tx.is_closed() {
            return Err(DeliveryError::Closed);
        }
        self.presence.send_if_modified(|slot| match slot {
            Some((current, _)) if *current >= version => false,
            _ => {
                *slot = Some((version, Arc::clone(frame)));
                true
            }
        });
        Ok(())
    }

    /// Signal the connection task to stop.
    pub(crate) fn close(&self) {
        self.closed.cancel();
    }
}

/// Receiving half of a connection's queue.
///
/// A pending presence snapshot is handed out before queued frames. Snapshots
/// replaced before the connection got to them are never seen, so the last
/// snapshot a connection reads is always the newest one announced to it.
#[derive(Debug)]
pub struct Mailbox {
    rx: mpsc::Receiver<Frame>,
    presence: watch::Receiver<PresenceSlot>,
    presence_version: u64,
}

impl Mailbox {
    /// Wait for the next frame. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Frame> {
        loop {
            if let Some(frame) = self.take_presence() {
                return Some(frame);
            }
            tokio::select! {
                biased;
                frame = self.rx.recv() => return frame,
                Ok(()) = self.presence.changed() => {}
            }
        }
    }

    /// Take the next pending frame without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.take_presence().or_else(|| self.rx.try_recv().ok())
    }

    /// Drain every pending frame.
    pub fn drain(&mut self) -> Vec<Frame> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    fn take_presence(&mut self) -> Option<Frame> {
        let slot = self.presence.borrow_and_update();
        match &*slot {
            Some((version, frame)) if *version > self.presence_version => {
                self.presence_version = *version;
                Some(Arc::clone(frame))
            }
            _ => None,
        }
    }
}

/// Create a queue of `capacity` frames for one connection.
///
/// Returns the sending half, the receiving half and the token cancelled when
/// the hub drops the connection.
pub fn channel(
    conn: ConnId,
    user: Option<UserId>,
    capacity: usize,
) -> (Arc<Outbound>, Mailbox, CancellationToken) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let (presence_tx, presence_rx) = watch::channel(None);
    let closed = CancellationToken::new();
    let outbound = Arc::new(Outbound {
        conn,
        user,
        tx,
        presence: presence_tx,
        closed: closed.clone(),
    });
    let mailbox = Mailbox {
        rx,
        presence: presence_rx,
        presence_version: 0,
    };
    (outbound, mailbox, closed)
}
