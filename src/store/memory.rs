//! In-process player record store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;

use super::records::{
    validate_handle_name, NewPlayerRecord, PlayerRecord, PlayerRecordUpdate, PlayerStatus,
    RecordError,
};
use super::PlayerRecordStore;

pub struct InMemoryRecordStore {
    records: RwLock<BTreeMap<u64, PlayerRecord>>,
    next_id: AtomicU64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first(mut records: Vec<PlayerRecord>) -> Vec<PlayerRecord> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    records
}

impl PlayerRecordStore for InMemoryRecordStore {
    fn list(&self) -> Vec<PlayerRecord> {
        newest_first(self.records.read().values().cloned().collect())
    }

    fn get(&self, id: u64) -> Option<PlayerRecord> {
        self.records.read().get(&id).cloned()
    }

    fn find_by_handle_name(&self, handle_name: &str) -> Option<PlayerRecord> {
        self.records
            .read()
            .values()
            .find(|r| r.handle_name == handle_name)
            .cloned()
    }

    fn list_by_status(&self, status: PlayerStatus) -> Vec<PlayerRecord> {
        newest_first(
            self.records
                .read()
                .values()
                .filter(|r| r.status == status)
                .cloned()
                .collect(),
        )
    }

    fn create(&self, new: NewPlayerRecord) -> Result<PlayerRecord, RecordError> {
        validate_handle_name(&new.handle_name)?;

        let now = Utc::now();
        let record = PlayerRecord {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            handle_name: new.handle_name,
            win_count: 0,
            lose_count: 0,
            status: new.status,
            created_at: now,
            updated_at: now,
        };

        self.records.write().insert(record.id, record.clone());
        Ok(record)
    }

    fn update(
        &self,
        id: u64,
        update: PlayerRecordUpdate,
    ) -> Result<Option<PlayerRecord>, RecordError> {
        if let Some(name) = &update.handle_name {
            validate_handle_name(name)?;
        }

        let mut records = self.records.write();
        let Some(record) = records.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = update.handle_name {
            record.handle_name = name;
        }
        if let Some(wins) = update.win_count {
            record.win_count = wins;
        }
        if let Some(losses) = update.lose_count {
            record.lose_count = losses;
        }
        if let Some(status) = update.status {
            record.status = status;
        }
        record.updated_at = Utc::now();

        Ok(Some(record.clone()))
    }

    fn delete(&self, id: u64) -> bool {
        self.records.write().remove(&id).is_some()
    }

    fn record_result(&self, id: u64, won: bool) -> Option<PlayerRecord> {
        let mut records = self.records.write();
        let record = records.get_mut(&id)?;
        if won {
            record.win_count = record.win_count.saturating_add(1);
        } else {
            record.lose_count = record.lose_count.saturating_add(1);
        }
        record.updated_at = Utc::now();
        Some(record.clone())
    }
}
