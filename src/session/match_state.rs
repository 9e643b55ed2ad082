//! Started / not-started flag for the single running match

use parking_lot::Mutex;

pub struct MatchStateController {
    started: Mutex<bool>,
}

impl MatchStateController {
    pub fn new() -> Self {
        Self {
            started: Mutex::new(false),
        }
    }

    /// Mark the match started. Returns true if this call changed the state.
    pub fn start(&self) -> bool {
        let mut started = self.started.lock();
        let changed = !*started;
        *started = true;
        changed
    }

    /// Mark the match stopped. Returns true if this call changed the state.
    pub fn reset(&self) -> bool {
        let mut started = self.started.lock();
        let changed = *started;
        *started = false;
        changed
    }

    pub fn is_started(&self) -> bool {
        *self.started.lock()
    }

    /// Human-readable state for diagnostics
    pub fn describe(&self) -> &'static str {
        if self.is_started() {
            "running"
        } else {
            "stopped"
        }
    }
}

impl Default for MatchStateController {
    fn default() -> Self {
        Self::new()
    }
}
