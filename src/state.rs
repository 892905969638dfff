use std::sync::Arc;

use tokio::sync::broadcast;

use crate::engine::TripManager;
use crate::observability::metrics::Metrics;
use crate::store::MemoryStore;

pub struct AppState {
    pub store: Arc<MemoryStore>,
    pub trips: TripManager,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), event_buffer_size)
    }

    pub fn with_store(store: Arc<MemoryStore>, event_buffer_size: usize) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let metrics = Metrics::new();
        let trips = TripManager::new(store.clone(), store.clone(), events_tx, metrics.clone());

        Self {
            store,
            trips,
            metrics,
        }
    }
}
