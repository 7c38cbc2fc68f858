//! Domain managers for hub state.
//!
//! Each manager owns one piece of the realtime state. None of them lock
//! anything themselves: the [`Hub`](crate::state::Hub) holds all of them
//! behind a single lock so disconnect cleanup is atomic.

pub mod presence;
pub mod registry;
pub mod rooms;
