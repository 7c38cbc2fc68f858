//! chatterd - realtime presence, fan-out and signaling daemon.
//!
//! Clients hold a WebSocket to the [`network::Gateway`]. The shared
//! [`state::Hub`] tracks which identities are online and which connections
//! joined which group rooms; the [`router::EventRouter`] turns targets into
//! live connections and queues one encoded frame on each.

pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod network;
pub mod router;
pub mod state;
pub mod tasks;
pub mod telemetry;
