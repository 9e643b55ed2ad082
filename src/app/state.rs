//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::session::SessionHub;
use crate::store::{InMemoryRecordStore, PlayerRecordStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// The single match session
    pub hub: Arc<SessionHub>,
    pub records: Arc<dyn PlayerRecordStore>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_records(config, Arc::new(InMemoryRecordStore::new()))
    }

    /// Build state around an externally provided record store
    pub fn with_records(config: Config, records: Arc<dyn PlayerRecordStore>) -> Self {
        Self {
            config: Arc::new(config),
            hub: Arc::new(SessionHub::new()),
            records,
        }
    }
}
