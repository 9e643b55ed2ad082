//! Session hub - join/leave/relay protocol for the two-player match
//!
//! Every membership change and every fan-out runs under the broadcast group
//! lock, so all participants observe events in the same order. Locks are
//! always taken group first, then registry, then match state.

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ws::protocol::{RelayEvent, ServerMsg};

use super::broadcast::{BroadcastGroup, Recipient};
use super::match_state::MatchStateController;
use super::registry::{IdentityRegistry, Participant, RejectReason, Rejected, CAPACITY};
use super::ConnectionId;

/// Protocol phase of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Unjoined,
    Joined,
    /// Terminal
    Left,
}

pub struct SessionHub {
    registry: IdentityRegistry,
    match_state: MatchStateController,
    group: Mutex<BroadcastGroup>,
    /// Open connections; entries are dropped on transport close
    connections: DashMap<ConnectionId, ConnectionPhase>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self {
            registry: IdentityRegistry::new(),
            match_state: MatchStateController::new(),
            group: Mutex::new(BroadcastGroup::new()),
            connections: DashMap::new(),
        }
    }

    /// Register a freshly accepted transport connection
    pub fn connect(&self) -> ConnectionId {
        let connection_id = Uuid::new_v4();
        self.connections
            .insert(connection_id, ConnectionPhase::Unjoined);
        connection_id
    }

    pub fn phase(&self, connection_id: &ConnectionId) -> Option<ConnectionPhase> {
        self.connections.get(connection_id).map(|p| *p)
    }

    /// Admit a connection into the match.
    ///
    /// The joiner gets a `JoinResult` reply and, on success, the current
    /// roster before the `Joined` fan-out. `MatchStarted` is sent once when
    /// the second slot fills.
    pub fn on_join(
        &self,
        connection_id: ConnectionId,
        display_name: String,
        outbound: mpsc::Sender<ServerMsg>,
    ) -> Result<Participant, Rejected> {
        let mut group = self.group.lock();

        let admitted = match self.phase(&connection_id) {
            Some(ConnectionPhase::Unjoined) => self.registry.try_admit(connection_id, display_name),
            Some(ConnectionPhase::Joined) => Err(RejectReason::AlreadyJoined.into()),
            Some(ConnectionPhase::Left) | None => Err(RejectReason::ConnectionClosed.into()),
        };

        let participant = match admitted {
            Ok(participant) => participant,
            Err(rejected) => {
                info!(
                    connection_id = %connection_id,
                    reason = rejected.reason.code(),
                    "Join rejected"
                );
                if let Err(e) = outbound.try_send(ServerMsg::JoinResult {
                    accepted: false,
                    slot: None,
                    reason: Some(rejected.reason.code().to_string()),
                }) {
                    debug!(connection_id = %connection_id, error = %e, "Join rejection not delivered");
                }
                return Err(rejected);
            }
        };

        let recipient = Recipient::new(participant.slot, outbound);
        recipient.deliver(&ServerMsg::JoinResult {
            accepted: true,
            slot: Some(participant.slot.into()),
            reason: None,
        });
        for other in self.registry.participants() {
            if other.connection_id != connection_id {
                recipient.deliver(&ServerMsg::Joined {
                    slot: other.slot.into(),
                    display_name: other.display_name,
                });
            }
        }

        group.insert(connection_id, recipient);
        self.connections
            .insert(connection_id, ConnectionPhase::Joined);

        group.fan_out(
            &ServerMsg::Joined {
                slot: participant.slot.into(),
                display_name: participant.display_name.clone(),
            },
            None,
        );

        info!(
            connection_id = %connection_id,
            slot = %participant.slot,
            display_name = %participant.display_name,
            participant_count = self.registry.count(),
            "Participant joined"
        );

        if self.registry.is_full() && !self.match_state.is_started() {
            self.match_state.start();
            let report = group.fan_out(&ServerMsg::MatchStarted, None);
            info!(delivered = report.delivered, "Match started");
        }

        Ok(participant)
    }

    /// Explicit leave. Moves the connection to the terminal phase; only the
    /// first call has side effects.
    pub fn on_leave(&self, connection_id: ConnectionId) -> Option<Participant> {
        let mut group = self.group.lock();

        let previous = self
            .connections
            .get_mut(&connection_id)
            .map(|mut phase| std::mem::replace(&mut *phase, ConnectionPhase::Left));

        if previous != Some(ConnectionPhase::Joined) {
            debug!(connection_id = %connection_id, ?previous, "Leave ignored");
            return None;
        }

        self.depart(&mut group, connection_id)
    }

    /// Transport closed. Runs the leave path if it has not already run and
    /// forgets the connection.
    pub fn on_disconnect(&self, connection_id: ConnectionId) -> Option<Participant> {
        let mut group = self.group.lock();
        self.connections.remove(&connection_id);
        self.depart(&mut group, connection_id)
    }

    /// Relay a participant event to everyone else, stamped with the
    /// sender's registered slot. Unknown senders are dropped.
    pub fn on_relay(&self, connection_id: ConnectionId, event: RelayEvent) -> bool {
        let group = self.group.lock();

        let Some(sender) = self.registry.get(&connection_id) else {
            debug!(
                connection_id = %connection_id,
                kind = event.kind(),
                "Relay from non-participant dropped"
            );
            return false;
        };

        let report = group.fan_out(&event.stamped(sender.slot), Some(connection_id));
        if report.dropped > 0 {
            debug!(
                slot = %sender.slot,
                dropped = report.dropped,
                "Relay partially delivered"
            );
        }
        true
    }

    /// Shared leave/disconnect cleanup. Tolerates a participant that is
    /// already gone.
    fn depart(&self, group: &mut BroadcastGroup, connection_id: ConnectionId) -> Option<Participant> {
        group.remove(&connection_id);

        let participant = self.registry.get(&connection_id)?;
        group.fan_out(
            &ServerMsg::Left {
                slot: participant.slot.into(),
            },
            None,
        );
        self.registry.remove(&connection_id);

        info!(
            connection_id = %connection_id,
            slot = %participant.slot,
            participant_count = self.registry.count(),
            "Participant left"
        );

        // No wire event for the reset; clients infer it from `Left`
        if self.registry.count() < CAPACITY && self.match_state.reset() {
            info!("Match reset, waiting for players");
        }

        Some(participant)
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.registry.participants()
    }

    pub fn participant_count(&self) -> usize {
        self.registry.count()
    }

    pub fn total_connections(&self) -> u64 {
        self.registry.total_connections()
    }

    pub fn open_connections(&self) -> usize {
        self.connections.len()
    }

    pub fn is_started(&self) -> bool {
        self.match_state.is_started()
    }

    pub fn match_state(&self) -> &'static str {
        self.match_state.describe()
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}
