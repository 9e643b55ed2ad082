//! Duel relay - session and state relay for two-player tank matches
//!
//! The hub admits two participants, assigns each a slot, and relays their
//! position, fire, health, explosion and result messages to the other side.
//! The `peer` module holds the receiving-side helpers clients use to apply
//! that stream.

pub mod app;
pub mod config;
pub mod http;
pub mod peer;
pub mod session;
pub mod store;
pub mod util;
pub mod ws;
