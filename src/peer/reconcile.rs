//! Local authority windows over relayed position
//!
//! When this process applies a physical effect (knockback from an
//! explosion) to a tank that is normally driven by relayed state, the next
//! snapshot from the peer would snap it straight back. A window suppresses
//! incoming position for that tank until it expires. Only the local apply
//! side is affected; nothing is coordinated with the peer.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ws::protocol::{ServerMsg, Slot};

/// Window claimed after a local explosion impulse
pub const DEFAULT_AUTHORITY_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
pub struct ReconciliationPolicy {
    windows: HashMap<Slot, Instant>,
}

impl ReconciliationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or replace the window for `target`, expiring at `now + duration`
    pub fn begin_local_authority_at(&mut self, target: Slot, now: Instant, duration: Duration) {
        self.windows.insert(target, now + duration);
    }

    pub fn should_apply_incoming(&self, target: Slot, now: Instant) -> bool {
        match self.windows.get(&target) {
            Some(expiry) => now >= *expiry,
            None => true,
        }
    }

    pub fn expiry(&self, target: Slot) -> Option<Instant> {
        self.windows.get(&target).copied()
    }

    pub fn clear(&mut self, target: Slot) {
        self.windows.remove(&target);
    }

    /// Drop windows that have lapsed
    pub fn prune(&mut self, now: Instant) {
        self.windows.retain(|_, expiry| now < *expiry);
    }

    /// Only position is continuously contested
    pub fn is_gated(msg: &ServerMsg) -> bool {
        matches!(msg, ServerMsg::PositionUpdate(_))
    }
}
