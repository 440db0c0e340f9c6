//! Database operations for the shipments `PostgreSQL` store.
//!
//! ## Tables
//!
//! - `shipment_addresses` - Destination addresses, unique per address tuple
//! - `shipments` - Shipment records referencing an address
//!
//! # Schema
//!
//! Tables are created by [`schema::ensure_schema`], run at API startup and via:
//! ```bash
//! shipments-cli migrate
//! ```

pub mod schema;
pub mod shipments;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use shipments_core::{ShipmentFilter, ShipmentInput, TrackingNumber};

use crate::models::Shipment;

pub use shipments::PgShipmentRepository;

/// Errors that can occur during repository operations.
///
/// Display messages stay generic; the driver error is kept as the source.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Writing a batch failed and the transaction was rolled back.
    #[error("failed to insert shipments")]
    Insertion(#[source] sqlx::Error),

    /// A text field is wider than its column; nothing was written.
    #[error("failed to insert shipments: record {index} field `{field}` is too long")]
    FieldTooLong { index: usize, field: &'static str },

    /// Reading shipments failed.
    #[error("failed to fetch shipments")]
    Fetch(#[source] sqlx::Error),

    /// Creating the schema failed.
    #[error("failed to initialize schema")]
    Schema(#[source] sqlx::Error),

    /// The store returned data inconsistent with what was written.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Persistence contract for shipments.
///
/// [`PgShipmentRepository`] is the production implementation; handlers only
/// see this trait so tests can substitute their own.
#[async_trait]
pub trait ShipmentRepository: Send + Sync {
    /// Persist a batch of validated shipments atomically.
    ///
    /// Returns the generated tracking numbers in input order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::FieldTooLong` if a text field exceeds its
    /// column, and `RepositoryError::Insertion` if any statement fails.
    /// Nothing from the batch is persisted in either case.
    async fn insert_shipments(
        &self,
        shipments: &[ShipmentInput],
    ) -> Result<Vec<TrackingNumber>, RepositoryError>;

    /// Fetch every shipment matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Fetch` if the query fails.
    async fn fetch_shipments(
        &self,
        filter: &ShipmentFilter,
    ) -> Result<Vec<Shipment>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
