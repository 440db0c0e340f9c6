//! Integration tests for the shipments service.
//!
//! # Running Tests
//!
//! ```bash
//! # Repository tests against a scratch database
//! TEST_DATABASE_URL=postgres://localhost/shipments_test \
//!     cargo test -p shipments-integration-tests -- --ignored
//!
//! # HTTP tests against a running API
//! SHIPMENTS_BASE_URL=http://127.0.0.1:8000 \
//!     cargo test -p shipments-integration-tests --test shipments_api -- --ignored
//! ```
//!
//! Every test writes addresses tagged with a fresh UUID so runs do not
//! interfere with each other or with existing rows.

use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use shipments_api::db::{create_pool, schema};
use shipments_core::ShipmentInput;

/// Base URL of a running API (configurable via `SHIPMENTS_BASE_URL`).
#[must_use]
pub fn base_url() -> String {
    std::env::var("SHIPMENTS_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
}

/// Connect to the test database and make sure the schema exists.
///
/// # Panics
///
/// Panics if `TEST_DATABASE_URL` is unset or the database is unreachable.
#[allow(clippy::expect_used)]
pub async fn test_pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to test database");
    schema::ensure_schema(&pool)
        .await
        .expect("Failed to create schema");
    pool
}

/// A unique first address line, so each test owns its addresses.
#[must_use]
pub fn unique_street() -> String {
    format!("{} Integration Way", Uuid::new_v4())
}

/// A valid JSON shipment record at `street`.
#[must_use]
pub fn sample_record(street: &str, date: &str, price: f64, carrier: &str) -> Value {
    json!({
        "shipment_date": date,
        "addr_line_1": street,
        "addr_line_2": null,
        "postal_code": "12345",
        "city": "Anytown",
        "country_code": "US",
        "length": 15,
        "width": 10,
        "height": 8,
        "weight": 2.5,
        "price_amt": price,
        "price_currency": "USD",
        "carrier": carrier
    })
}

/// A validated shipment at `street`.
///
/// # Panics
///
/// Panics if the record fails validation, e.g. `date` is not `YYYY-MM-DD`.
#[must_use]
#[allow(clippy::expect_used)]
pub fn sample_input(street: &str, date: &str, price: f64, carrier: &str) -> ShipmentInput {
    shipments_core::parse_shipments(&[sample_record(street, date, price, carrier)])
        .expect("sample record is valid")
        .remove(0)
}
