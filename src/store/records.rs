//! Historical player records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest accepted handle name
pub const MAX_HANDLE_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    #[default]
    Active,
    Suspended,
    Banned,
}

/// Stored player record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: u64,
    pub handle_name: String,
    pub win_count: u32,
    pub lose_count: u32,
    pub status: PlayerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlayerRecord {
    pub fn total_games(&self) -> u32 {
        self.win_count.saturating_add(self.lose_count)
    }

    pub fn win_rate(&self) -> f64 {
        match self.total_games() {
            0 => 0.0,
            total => self.win_count as f64 / total as f64,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PlayerStatus::Active
    }
}

/// New record for insertion; id and timestamps are assigned by the store
#[derive(Debug, Clone, Deserialize)]
pub struct NewPlayerRecord {
    pub handle_name: String,
    #[serde(default)]
    pub status: PlayerStatus,
}

/// Record update
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerRecordUpdate {
    #[serde(default)]
    pub handle_name: Option<String>,
    #[serde(default)]
    pub win_count: Option<u32>,
    #[serde(default)]
    pub lose_count: Option<u32>,
    #[serde(default)]
    pub status: Option<PlayerStatus>,
}

/// Player record store errors
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Handle name must be 1-100 characters and not blank")]
    InvalidHandleName,
}

pub fn validate_handle_name(name: &str) -> Result<(), RecordError> {
    if name.trim().is_empty() || name.chars().count() > MAX_HANDLE_NAME_LEN {
        return Err(RecordError::InvalidHandleName);
    }
    Ok(())
}
