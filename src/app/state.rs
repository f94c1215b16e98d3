use crate::adapters::memory::InMemoryStore;
use crate::app::service::{ReservationService, TableService};
use crate::domain::ports::{Clock, ReservationRepository, TableRepository};
use std::sync::Arc;

/// 路由共用的應用狀態
#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<ReservationService>,
    pub tables: Arc<TableService>,
}

impl AppState {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        tables: Arc<dyn TableRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            reservations: Arc::new(ReservationService::new(reservations.clone(), clock.clone())),
            tables: Arc::new(TableService::new(tables, reservations, clock)),
        }
    }

    /// Wires both services to one shared in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>, clock: Arc<dyn Clock>) -> Self {
        Self::new(store.clone(), store, clock)
    }
}
