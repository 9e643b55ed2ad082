//! Client-side consumers of relayed state

pub mod identity;
pub mod mirror;
pub mod reconcile;

pub use identity::normalize;
pub use mirror::{default_display_name, MirrorAction, PeerMirror};
pub use reconcile::{ReconciliationPolicy, DEFAULT_AUTHORITY_WINDOW};
