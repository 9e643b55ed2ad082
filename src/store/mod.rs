//! Player record storage

pub mod memory;
pub mod records;

pub use memory::InMemoryRecordStore;
pub use records::{NewPlayerRecord, PlayerRecord, PlayerRecordUpdate, PlayerStatus, RecordError};

/// Storage backend for historical player records
pub trait PlayerRecordStore: Send + Sync {
    /// All records, newest first
    fn list(&self) -> Vec<PlayerRecord>;

    fn get(&self, id: u64) -> Option<PlayerRecord>;

    fn find_by_handle_name(&self, handle_name: &str) -> Option<PlayerRecord>;

    fn list_by_status(&self, status: PlayerStatus) -> Vec<PlayerRecord>;

    /// Insert a record; the store assigns id and timestamps
    fn create(&self, new: NewPlayerRecord) -> Result<PlayerRecord, RecordError>;

    /// Apply an update. `Ok(None)` if the record does not exist.
    fn update(
        &self,
        id: u64,
        update: PlayerRecordUpdate,
    ) -> Result<Option<PlayerRecord>, RecordError>;

    fn delete(&self, id: u64) -> bool;

    /// Bump the win or loss counter
    fn record_result(&self, id: u64, won: bool) -> Option<PlayerRecord>;
}
