use crate::service::MarketService;
use crate::storage::SqliteStorage;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared state for all handlers
pub struct AppState {
    pub service: MarketService,
    // Locked only for synchronous queries, never across a provider call.
    pub storage: Arc<Mutex<SqliteStorage>>,
}

impl AppState {
    pub fn new(service: MarketService, storage: Arc<Mutex<SqliteStorage>>) -> Arc<Self> {
        Arc::new(Self { service, storage })
    }
}
