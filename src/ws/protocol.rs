//! WebSocket protocol message definitions
//! These are the wire types for client-hub communication

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical participant identity inside a match (1 or 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "i32")]
pub struct Slot(u8);

impl Slot {
    pub const ONE: Slot = Slot(1);
    pub const TWO: Slot = Slot(2);

    /// Both slots in ascending order
    pub const ALL: [Slot; 2] = [Slot::ONE, Slot::TWO];

    /// Accept a wire value only if it names a real slot
    pub fn from_wire(value: i32) -> Option<Slot> {
        match value {
            1 => Some(Slot::ONE),
            2 => Some(Slot::TWO),
            _ => None,
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The opposing slot in a two-party match
    pub fn other(self) -> Slot {
        if self == Slot::ONE {
            Slot::TWO
        } else {
            Slot::ONE
        }
    }
}

impl From<Slot> for i32 {
    fn from(slot: Slot) -> Self {
        slot.0 as i32
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tank transform sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    /// Sender slot; overwritten by the hub before relay
    #[serde(default)]
    pub slot: i32,
    pub pos_x: f32,
    pub pos_y: f32,
    pub pos_z: f32,
    /// Yaw in degrees
    pub rot_y: f32,
}

/// Shell launch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireData {
    #[serde(default)]
    pub slot: i32,
    pub pos_x: f32,
    pub pos_y: f32,
    pub pos_z: f32,
    pub dir_x: f32,
    pub dir_y: f32,
    pub dir_z: f32,
    /// Launch force
    pub force: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthData {
    #[serde(default)]
    pub slot: i32,
    pub current_health: f32,
}

/// Explosion computed by the sender and acting on another participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplosionData {
    #[serde(default)]
    pub slot: i32,
    /// Participant the impulse acts on (passed through unchanged)
    pub target_slot: i32,
    pub pos_x: f32,
    pub pos_y: f32,
    pub pos_z: f32,
    pub force: f32,
    pub radius: f32,
    pub damage: f32,
}

/// Round or match outcome as seen by the sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResultData {
    #[serde(default)]
    pub slot: i32,
    /// Winner of the round (passed through unchanged)
    pub winner_slot: i32,
    pub round_number: i32,
    pub is_match_end: bool,
    pub winner_name: String,
}

/// Messages sent from client to hub
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request a slot in the match
    Join { display_name: String },

    /// Leave the match; the connection cannot rejoin
    Leave,

    PositionUpdate(PositionData),
    FireEvent(FireData),
    HealthUpdate(HealthData),
    ExplosionImpulse(ExplosionData),
    MatchResult(MatchResultData),

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

impl ClientMsg {
    /// Split off the payloads that are relayed to the other participant
    pub fn into_relay(self) -> Result<RelayEvent, ClientMsg> {
        match self {
            ClientMsg::PositionUpdate(data) => Ok(RelayEvent::Position(data)),
            ClientMsg::FireEvent(data) => Ok(RelayEvent::Fire(data)),
            ClientMsg::HealthUpdate(data) => Ok(RelayEvent::Health(data)),
            ClientMsg::ExplosionImpulse(data) => Ok(RelayEvent::Explosion(data)),
            ClientMsg::MatchResult(data) => Ok(RelayEvent::Result(data)),
            other => Err(other),
        }
    }
}

/// Messages sent from hub to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Reply to a join request, sent only to the joiner
    JoinResult {
        accepted: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slot: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// A participant was admitted
    Joined { slot: i32, display_name: String },

    /// A participant left or disconnected
    Left { slot: i32 },

    /// Both slots are filled
    MatchStarted,

    PositionUpdate(PositionData),
    FireEvent(FireData),
    HealthUpdate(HealthData),
    ExplosionImpulse(ExplosionData),
    MatchResult(MatchResultData),

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },

    /// Error message
    Error { code: String, message: String },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// A participant-originated event awaiting fan-out
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Position(PositionData),
    Fire(FireData),
    Health(HealthData),
    Explosion(ExplosionData),
    Result(MatchResultData),
}

impl RelayEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            RelayEvent::Position(_) => "position_update",
            RelayEvent::Fire(_) => "fire_event",
            RelayEvent::Health(_) => "health_update",
            RelayEvent::Explosion(_) => "explosion_impulse",
            RelayEvent::Result(_) => "match_result",
        }
    }

    /// Overwrite whatever slot the sender asserted with its registered one
    pub fn stamped(self, sender: Slot) -> ServerMsg {
        let slot = i32::from(sender);
        match self {
            RelayEvent::Position(data) => ServerMsg::PositionUpdate(PositionData { slot, ..data }),
            RelayEvent::Fire(data) => ServerMsg::FireEvent(FireData { slot, ..data }),
            RelayEvent::Health(data) => ServerMsg::HealthUpdate(HealthData { slot, ..data }),
            RelayEvent::Explosion(data) => {
                ServerMsg::ExplosionImpulse(ExplosionData { slot, ..data })
            }
            RelayEvent::Result(data) => ServerMsg::MatchResult(MatchResultData { slot, ..data }),
        }
    }
}
