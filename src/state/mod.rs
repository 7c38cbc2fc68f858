//! State management module.
//!
//! Contains the Hub (shared realtime state) and the pieces it is built from.

mod conn_id;
mod hub;
pub mod managers;
pub mod outbound;

pub use conn_id::{ConnId, ConnIdGenerator};
pub use hub::{DeliveryReport, Hub, Session};
pub use outbound::{Frame, Mailbox, Outbound};
