//! Schema bootstrap command.
//!
//! # Usage
//!
//! ```bash
//! shipments-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SHIPMENTS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Runs the same idempotent bootstrap the API performs on startup, under the
//! same advisory lock, so it is safe to run while instances are starting.

use thiserror::Error;

use shipments_api::config::{self, ConfigError};
use shipments_api::db::{self, RepositoryError, schema};

/// Errors that can occur while bootstrapping the schema.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Database URL is not configured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    /// Schema statements failed.
    #[error("Schema error: {0}")]
    Schema(#[from] RepositoryError),
}

/// Create the shipments schema if it does not exist.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a statement fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url = config::get_database_url("SHIPMENTS_DATABASE_URL")?;

    tracing::info!("Connecting to shipments database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Creating schema...");
    schema::ensure_schema(&pool).await?;

    tracing::info!("Schema ready");
    Ok(())
}
