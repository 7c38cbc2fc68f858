//! Integration test common infrastructure.
//!
//! Provides an in-process server on ephemeral ports and a WebSocket test
//! client that asserts on JSON event flows.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;
