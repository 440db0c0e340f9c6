//! Repository tests against a real `PostgreSQL` database.
//!
//! These tests require:
//! - A reachable `PostgreSQL` database in `TEST_DATABASE_URL`
//!
//! Run with: cargo test -p shipments-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;
use shipments_api::db::{PgShipmentRepository, RepositoryError, ShipmentRepository, schema};
use shipments_core::{ShipmentFilter, TrackingNumber};
use shipments_integration_tests::{sample_input, test_pool, unique_street};
use sqlx::PgPool;

async fn address_count(pool: &PgPool, street: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM shipment_addresses WHERE addr_line_1 = $1")
        .bind(street)
        .fetch_one(pool)
        .await
        .expect("Failed to count addresses")
}

async fn shipments_at(pool: &PgPool, street: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM shipments s JOIN shipment_addresses a ON a.id = s.address_id \
         WHERE a.addr_line_1 = $1",
    )
    .bind(street)
    .fetch_one(pool)
    .await
    .expect("Failed to count shipments")
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_schema_bootstrap_is_idempotent() {
    let pool = test_pool().await;

    let (first, second) = tokio::join!(schema::ensure_schema(&pool), schema::ensure_schema(&pool));
    first.expect("first bootstrap failed");
    second.expect("concurrent bootstrap failed");
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_insert_returns_one_tracking_number_per_record() {
    let pool = test_pool().await;
    let repo = PgShipmentRepository::new(pool.clone());
    let street = unique_street();

    let batch = [
        sample_input(&street, "2021-03-01", 10.0, "ups"),
        sample_input(&street, "2021-03-02", 20.0, "fedex"),
        sample_input(&street, "2021-03-03", 30.0, "dhl-express"),
    ];
    let tracking_numbers = repo.insert_shipments(&batch).await.expect("insert failed");

    assert_eq!(tracking_numbers.len(), 3);
    assert_eq!(shipments_at(&pool, &street).await, 3);
    assert_eq!(address_count(&pool, &street).await, 1);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_address_is_reused_across_batches() {
    let pool = test_pool().await;
    let repo = PgShipmentRepository::new(pool.clone());
    let street = unique_street();

    let first = repo
        .insert_shipments(&[sample_input(&street, "2021-04-01", 10.0, "ups")])
        .await
        .expect("first insert failed");
    let second = repo
        .insert_shipments(&[sample_input(&street, "2021-04-02", 12.0, "ups")])
        .await
        .expect("second insert failed");

    assert_eq!(address_count(&pool, &street).await, 1);

    let address_ids: Vec<_> = repo
        .fetch_shipments(&ShipmentFilter::default())
        .await
        .expect("fetch failed")
        .into_iter()
        .filter(|s| s.tracking_no == first[0] || s.tracking_no == second[0])
        .map(|s| s.address_id)
        .collect();
    assert_eq!(address_ids.len(), 2);
    assert_eq!(address_ids[0], address_ids[1]);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_tracking_numbers_follow_input_rows() {
    let pool = test_pool().await;
    let repo = PgShipmentRepository::new(pool.clone());
    let existing = unique_street();
    repo.insert_shipments(&[sample_input(&existing, "2021-06-01", 10.0, "ups")])
        .await
        .expect("seed insert failed");

    let fresh: Vec<String> = (0..4).map(|_| unique_street()).collect();
    let streets = [
        fresh[0].clone(),
        existing.clone(),
        fresh[1].clone(),
        fresh[2].clone(),
        fresh[0].clone(),
        fresh[3].clone(),
    ];
    let batch: Vec<_> = streets
        .iter()
        .enumerate()
        .map(|(i, street)| {
            let day = format!("2021-06-{:02}", i + 2);
            sample_input(street, &day, 10.0, "fedex")
        })
        .collect();

    let tracking_numbers = repo.insert_shipments(&batch).await.expect("insert failed");
    assert_eq!(tracking_numbers.len(), streets.len());

    for (tracking_no, (street, input)) in tracking_numbers.iter().zip(streets.iter().zip(&batch)) {
        let (stored_street, stored_date): (String, chrono::NaiveDate) = sqlx::query_as(
            "SELECT a.addr_line_1, s.shipment_date FROM shipments s \
             JOIN shipment_addresses a ON a.id = s.address_id WHERE s.tracking_no = $1",
        )
        .bind(tracking_no.as_uuid())
        .fetch_one(&pool)
        .await
        .expect("Failed to look up shipment");

        assert_eq!(&stored_street, street);
        assert_eq!(stored_date, input.shipment_date);
    }

    assert_eq!(address_count(&pool, &existing).await, 1);
    assert_eq!(address_count(&pool, &fresh[0]).await, 1);
    assert_eq!(shipments_at(&pool, &fresh[0]).await, 2);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_over_wide_country_is_refused() {
    let pool = test_pool().await;
    let repo = PgShipmentRepository::new(pool.clone());
    let street = unique_street();

    let mut input = sample_input(&street, "2021-07-01", 10.0, "ups");
    input.country_code = "USA".to_string();
    input.postal_code = "9".repeat(60);

    let result = repo.insert_shipments(&[input]).await;

    assert!(matches!(result, Err(RepositoryError::FieldTooLong { .. })));
    assert_eq!(address_count(&pool, &street).await, 0);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_bad_carrier_rolls_back_whole_batch() {
    let pool = test_pool().await;
    let repo = PgShipmentRepository::new(pool.clone());
    let street = unique_street();

    let batch = [
        sample_input(&street, "2021-05-01", 10.0, "ups"),
        sample_input(&street, "2021-05-02", 10.0, "pigeon-post"),
    ];
    let result = repo.insert_shipments(&batch).await;

    assert!(result.is_err());
    assert_eq!(shipments_at(&pool, &street).await, 0);
    assert_eq!(address_count(&pool, &street).await, 0);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_fetch_applies_filters() {
    let pool = test_pool().await;
    let repo = PgShipmentRepository::new(pool);
    let street = unique_street();

    let inserted = repo
        .insert_shipments(&[
            sample_input(&street, "1999-01-01", 150.0, "ups"),
            sample_input(&street, "1999-01-31", 600.0, "ups"),
            sample_input(&street, "1999-02-01", 200.0, "fedex"),
        ])
        .await
        .expect("insert failed");
    let ours = |found: Vec<shipments_api::models::Shipment>| -> Vec<TrackingNumber> {
        found
            .into_iter()
            .map(|s| s.tracking_no)
            .filter(|t| inserted.contains(t))
            .collect()
    };

    let january = ShipmentFilter::from_params([("date", "1999-01-01:1999-01-31")]).unwrap();
    let found = repo.fetch_shipments(&january).await.expect("fetch failed");
    assert_eq!(ours(found), vec![inserted[0], inserted[1]]);

    let cheap_ups =
        ShipmentFilter::from_params([("carrier", "ups"), ("price", "100:500")]).unwrap();
    let found = repo.fetch_shipments(&cheap_ups).await.expect("fetch failed");
    assert_eq!(ours(found), vec![inserted[0]]);

    let fedex = ShipmentFilter::from_params([("carrier", "fedex")]).unwrap();
    let found = repo.fetch_shipments(&fedex).await.expect("fetch failed");
    let shipment = found
        .into_iter()
        .find(|s| s.tracking_no == inserted[2])
        .expect("fedex shipment missing");
    assert_eq!(shipment.price_amt, Decimal::new(200, 0));
    assert_eq!(shipment.weight, Decimal::new(25, 1));
}
