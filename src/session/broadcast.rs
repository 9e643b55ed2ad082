//! Broadcast group - outbound handles of admitted participants

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::ws::protocol::{ServerMsg, Slot};

use super::ConnectionId;

/// Send side of one participant's outbound queue
#[derive(Debug, Clone)]
pub struct Recipient {
    pub slot: Slot,
    tx: mpsc::Sender<ServerMsg>,
}

impl Recipient {
    pub fn new(slot: Slot, tx: mpsc::Sender<ServerMsg>) -> Self {
        Self { slot, tx }
    }

    /// Queue a message without waiting. A full queue drops the message
    /// so a stalled peer never holds up the sender.
    pub fn deliver(&self, msg: &ServerMsg) -> bool {
        match self.tx.try_send(msg.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(slot = %self.slot, "Outbound queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!(slot = %self.slot, "Outbound queue closed");
                false
            }
        }
    }
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    pub dropped: usize,
}

/// The set of participants that receive relayed traffic
#[derive(Debug, Default)]
pub struct BroadcastGroup {
    members: HashMap<ConnectionId, Recipient>,
}

impl BroadcastGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, connection_id: ConnectionId, recipient: Recipient) {
        self.members.insert(connection_id, recipient);
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<Recipient> {
        self.members.remove(connection_id)
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.members.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Send to every member except `exclude`. Each send is independent.
    pub fn fan_out(&self, msg: &ServerMsg, exclude: Option<ConnectionId>) -> FanOut {
        let mut report = FanOut::default();
        for (id, recipient) in &self.members {
            if Some(*id) == exclude {
                continue;
            }
            if recipient.deliver(msg) {
                report.delivered += 1;
            } else {
                report.dropped += 1;
            }
        }
        report
    }
}
