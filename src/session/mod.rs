//! Match session core: identity, match state, broadcast fan-out

pub mod broadcast;
pub mod hub;
pub mod match_state;
pub mod registry;

pub use broadcast::{BroadcastGroup, FanOut, Recipient};
pub use hub::{ConnectionPhase, SessionHub};
pub use match_state::MatchStateController;
pub use registry::{IdentityRegistry, Participant, RejectReason, Rejected, CAPACITY};

/// Transport-level connection identifier, minted per accepted socket
pub type ConnectionId = uuid::Uuid;
