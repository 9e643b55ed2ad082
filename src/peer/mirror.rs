//! Receiving participant's view of the relay stream
//!
//! `PeerMirror` turns hub messages into actions for the local game loop.
//! All remote-asserted slots are normalized, echoes of our own slot are
//! ignored, and position goes through the reconciliation gate.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

use crate::ws::protocol::{ServerMsg, Slot};

use super::identity::normalize;
use super::reconcile::ReconciliationPolicy;

/// What the local game loop should do with one hub message
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorAction {
    Admitted { slot: Slot },
    Refused { reason: Option<String> },
    SpawnLocal { slot: Slot, display_name: String },
    SpawnRemote { slot: Slot, display_name: String },
    DespawnRemote { slot: Slot },
    MatchStarted,
    /// Population fell below two after a start
    MatchReset,
    MoveRemote { slot: Slot, position: [f32; 3], rot_y: f32 },
    FireFrom { slot: Slot, origin: [f32; 3], direction: [f32; 3], force: f32 },
    SetHealth { slot: Slot, current_health: f32 },
    ApplyImpulse {
        source: Slot,
        target: Slot,
        origin: [f32; 3],
        force: f32,
        radius: f32,
        damage: f32,
    },
    RoundResult {
        winner: Slot,
        round_number: i32,
        is_match_end: bool,
        winner_name: String,
    },
    /// Position held back by a local authority window
    Suppressed { slot: Slot },
    ServerError { code: String, message: String },
    Ignored,
}

pub struct PeerMirror {
    display_name: String,
    local_slot: Option<Slot>,
    roster: BTreeMap<Slot, String>,
    health: BTreeMap<Slot, f32>,
    started: bool,
    policy: ReconciliationPolicy,
}

impl PeerMirror {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            local_slot: None,
            roster: BTreeMap::new(),
            health: BTreeMap::new(),
            started: false,
            policy: ReconciliationPolicy::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn local_slot(&self) -> Option<Slot> {
        self.local_slot
    }

    pub fn roster(&self) -> &BTreeMap<Slot, String> {
        &self.roster
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn health(&self, slot: Slot) -> Option<f32> {
        self.health.get(&slot).copied()
    }

    /// Called by the local physics layer before it pushes `target` around
    pub fn begin_local_authority(&mut self, target: Slot, now: Instant, duration: Duration) {
        self.policy.begin_local_authority_at(target, now, duration);
    }

    /// Expiry of the open authority window over `target`, if any
    pub fn authority_expiry(&self, target: Slot) -> Option<Instant> {
        self.policy.expiry(target)
    }

    fn resolve(&self, asserted: i32) -> Slot {
        normalize(asserted, self.local_slot)
    }

    fn is_echo(&self, slot: Slot) -> bool {
        self.local_slot == Some(slot)
    }

    pub fn apply(&mut self, msg: ServerMsg, now: Instant) -> Vec<MirrorAction> {
        self.policy.prune(now);
        let gated = ReconciliationPolicy::is_gated(&msg);

        match msg {
            ServerMsg::JoinResult {
                accepted: true,
                slot,
                ..
            } => {
                let slot = self.resolve(slot.unwrap_or_default());
                self.local_slot = Some(slot);
                vec![MirrorAction::Admitted { slot }]
            }
            ServerMsg::JoinResult { reason, .. } => vec![MirrorAction::Refused { reason }],

            ServerMsg::Joined { slot, display_name } => {
                let mut slot = self.resolve(slot);

                // The hub may rename us, so our own seat is known by slot alone.
                // A second claimant of a seat we already hold goes to the other one.
                let is_local = self.is_echo(slot)
                    && self
                        .roster
                        .get(&slot)
                        .map_or(true, |seated| *seated == display_name);

                if self.is_echo(slot) && !is_local {
                    warn!(slot = %slot, display_name = %display_name, "Duplicate slot, remapping peer");
                    slot = slot.other();
                }

                self.roster.insert(slot, display_name.clone());
                if is_local {
                    self.display_name = display_name.clone();
                    vec![MirrorAction::SpawnLocal { slot, display_name }]
                } else {
                    vec![MirrorAction::SpawnRemote { slot, display_name }]
                }
            }

            ServerMsg::Left { slot } => {
                let slot = self.resolve(slot);
                self.roster.remove(&slot);
                self.health.remove(&slot);
                self.policy.clear(slot);

                let mut actions = vec![MirrorAction::DespawnRemote { slot }];
                if self.started && self.roster.len() < 2 {
                    self.started = false;
                    actions.push(MirrorAction::MatchReset);
                }
                actions
            }

            ServerMsg::MatchStarted => {
                self.started = true;
                vec![MirrorAction::MatchStarted]
            }

            ServerMsg::PositionUpdate(data) => {
                let slot = self.resolve(data.slot);
                if self.is_echo(slot) {
                    return vec![MirrorAction::Ignored];
                }
                if gated && !self.policy.should_apply_incoming(slot, now) {
                    debug!(slot = %slot, "Position suppressed by local authority");
                    return vec![MirrorAction::Suppressed { slot }];
                }
                vec![MirrorAction::MoveRemote {
                    slot,
                    position: [data.pos_x, data.pos_y, data.pos_z],
                    rot_y: data.rot_y,
                }]
            }

            ServerMsg::FireEvent(data) => {
                let slot = self.resolve(data.slot);
                if self.is_echo(slot) {
                    return vec![MirrorAction::Ignored];
                }
                vec![MirrorAction::FireFrom {
                    slot,
                    origin: [data.pos_x, data.pos_y, data.pos_z],
                    direction: [data.dir_x, data.dir_y, data.dir_z],
                    force: data.force,
                }]
            }

            ServerMsg::HealthUpdate(data) => {
                let slot = self.resolve(data.slot);
                if self.is_echo(slot) {
                    return vec![MirrorAction::Ignored];
                }
                self.health.insert(slot, data.current_health);
                vec![MirrorAction::SetHealth {
                    slot,
                    current_health: data.current_health,
                }]
            }

            ServerMsg::ExplosionImpulse(data) => vec![MirrorAction::ApplyImpulse {
                source: self.resolve(data.slot),
                target: self.resolve(data.target_slot),
                origin: [data.pos_x, data.pos_y, data.pos_z],
                force: data.force,
                radius: data.radius,
                damage: data.damage,
            }],

            ServerMsg::MatchResult(data) => vec![MirrorAction::RoundResult {
                winner: self.resolve(data.winner_slot),
                round_number: data.round_number,
                is_match_end: data.is_match_end,
                winner_name: data.winner_name,
            }],

            ServerMsg::Error { code, message } => vec![MirrorAction::ServerError { code, message }],

            ServerMsg::Pong { .. } => vec![MirrorAction::Ignored],
        }
    }
}

/// Fallback name for clients without a configured one
pub fn default_display_name() -> String {
    format!("Player_{}", rand::thread_rng().gen_range(1..10000))
}
