//! Schema bootstrap for the shipments store.
//!
//! [`ensure_schema`] is idempotent and safe to run from several processes at
//! once: every run holds a transaction-scoped advisory lock, so concurrent
//! runs execute one after another. Postgres releases the lock when the
//! transaction ends, whether it commits, rolls back, or the connection drops.

use sqlx::PgPool;

use super::RepositoryError;

/// Advisory lock key serializing schema bootstrap across processes.
pub const SCHEMA_LOCK_KEY: i64 = 123_456;

/// Carriers accepted by the `shipments.carrier` check constraint.
pub const CARRIERS: [&str; 3] = ["dhl-express", "ups", "fedex"];

const CREATE_EXTENSION: &str = "CREATE EXTENSION IF NOT EXISTS pgcrypto";

const CREATE_ADDRESSES: &str = r"
CREATE TABLE IF NOT EXISTS shipment_addresses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    addr_line_1 VARCHAR(255) NOT NULL,
    addr_line_2 VARCHAR(255),
    postal_code VARCHAR(50) NOT NULL,
    city VARCHAR(100) NOT NULL,
    country_code CHAR(2) NOT NULL,
    CONSTRAINT uq_shipment_address UNIQUE NULLS NOT DISTINCT
        (addr_line_1, addr_line_2, postal_code, city, country_code)
)";

const CREATE_SHIPMENTS: &str = r"
CREATE TABLE IF NOT EXISTS shipments (
    tracking_no UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    address_id UUID NOT NULL,
    shipment_date DATE NOT NULL,
    length NUMERIC(10, 2) NOT NULL CHECK (length > 0),
    width NUMERIC(10, 2) NOT NULL CHECK (width > 0),
    height NUMERIC(10, 2) NOT NULL CHECK (height > 0),
    weight NUMERIC(10, 2) NOT NULL CHECK (weight > 0),
    price_amt NUMERIC(10, 2) NOT NULL CHECK (price_amt > 0),
    price_currency CHAR(3) NOT NULL,
    carrier VARCHAR(11) NOT NULL CHECK (carrier IN ('dhl-express', 'ups', 'fedex')),
    CONSTRAINT fk_address FOREIGN KEY (address_id) REFERENCES shipment_addresses (id)
)";

/// Ensure the `pgcrypto` extension and both tables exist.
///
/// # Errors
///
/// Returns `RepositoryError::Schema` if the store is unreachable or any
/// statement fails. The transaction is rolled back and the lock released.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), RepositoryError> {
    let mut tx = pool.begin().await.map_err(RepositoryError::Schema)?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(SCHEMA_LOCK_KEY)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::Schema)?;
    tracing::debug!(lock_key = SCHEMA_LOCK_KEY, "Acquired schema advisory lock");

    for statement in [CREATE_EXTENSION, CREATE_ADDRESSES, CREATE_SHIPMENTS] {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::Schema)?;
    }

    tx.commit().await.map_err(RepositoryError::Schema)?;
    tracing::info!("Shipments schema ready");
    Ok(())
}
