//! Network module.
//!
//! Contains the Gateway (WS/WSS listener) and the per-connection task.

mod connection;
mod gateway;

pub use connection::handshake::{HANDSHAKE_TIMEOUT, HandshakeError};
pub use connection::{Connection, ConnectionSettings, Exit};
pub use gateway::Gateway;
