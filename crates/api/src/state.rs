//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::db::{PgShipmentRepository, ShipmentRepository};

/// Application state shared across all handlers.
///
/// Cheaply cloneable; the repository is shared behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    repository: Arc<dyn ShipmentRepository>,
}

impl AppState {
    /// Create application state around any repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn ShipmentRepository>) -> Self {
        Self { repository }
    }

    /// Create application state backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool) -> Self {
        Self::new(Arc::new(PgShipmentRepository::new(pool)))
    }

    /// Get the shipment repository.
    #[must_use]
    pub fn shipments(&self) -> &dyn ShipmentRepository {
        self.repository.as_ref()
    }
}
