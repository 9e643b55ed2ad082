//! WebSocket transport: wire protocol and per-connection socket handling

pub mod handler;
pub mod protocol;
