//! Identity registry - connection to slot assignment

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::ws::protocol::Slot;

use super::ConnectionId;

/// Participants per match
pub const CAPACITY: usize = 2;

/// An admitted connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: ConnectionId,
    pub slot: Slot,
    pub display_name: String,
}

/// Why an admission was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason {
    #[error("match is full")]
    Full,

    #[error("connection already joined")]
    AlreadyJoined,

    #[error("connection has already left")]
    ConnectionClosed,
}

impl RejectReason {
    /// Stable code sent to clients
    pub fn code(self) -> &'static str {
        match self {
            RejectReason::Full => "full",
            RejectReason::AlreadyJoined => "already_joined",
            RejectReason::ConnectionClosed => "connection_closed",
        }
    }
}

/// Admission refusal; an expected outcome, not a transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("join rejected: {reason}")]
pub struct Rejected {
    pub reason: RejectReason,
}

impl From<RejectReason> for Rejected {
    fn from(reason: RejectReason) -> Self {
        Self { reason }
    }
}

/// Registry of live participants, capped at [`CAPACITY`]
pub struct IdentityRegistry {
    participants: Mutex<HashMap<ConnectionId, Participant>>,
    /// Successful admissions since startup, never reset
    total_connections: AtomicU64,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self {
            participants: Mutex::new(HashMap::new()),
            total_connections: AtomicU64::new(0),
        }
    }

    /// Admit a connection into the lowest free slot.
    ///
    /// The capacity check and the insert happen under one lock, so two
    /// concurrent admissions can never both take the last slot.
    pub fn try_admit(
        &self,
        connection_id: ConnectionId,
        display_name: impl Into<String>,
    ) -> Result<Participant, Rejected> {
        let mut participants = self.participants.lock();

        if participants.contains_key(&connection_id) {
            return Err(RejectReason::AlreadyJoined.into());
        }

        if participants.len() >= CAPACITY {
            return Err(RejectReason::Full.into());
        }

        let slot = Slot::ALL
            .into_iter()
            .find(|slot| participants.values().all(|p| p.slot != *slot))
            .ok_or(Rejected::from(RejectReason::Full))?;

        let participant = Participant {
            connection_id,
            slot,
            display_name: display_name.into(),
        };

        participants.insert(connection_id, participant.clone());
        self.total_connections.fetch_add(1, Ordering::Relaxed);

        Ok(participant)
    }

    /// Remove a participant; removing an absent connection is a no-op
    pub fn remove(&self, connection_id: &ConnectionId) -> Option<Participant> {
        self.participants.lock().remove(connection_id)
    }

    pub fn get(&self, connection_id: &ConnectionId) -> Option<Participant> {
        self.participants.lock().get(connection_id).cloned()
    }

    pub fn count(&self) -> usize {
        self.participants.lock().len()
    }

    pub fn is_full(&self) -> bool {
        self.count() >= CAPACITY
    }

    /// Snapshot of live participants ordered by slot
    pub fn participants(&self) -> Vec<Participant> {
        let mut list: Vec<Participant> = self.participants.lock().values().cloned().collect();
        list.sort_by_key(|p| p.slot);
        list
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections.load(Ordering::Relaxed)
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
