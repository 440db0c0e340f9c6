//! `PostgreSQL` implementation of [`ShipmentRepository`].
//!
//! Queries are assembled at runtime with [`QueryBuilder`] since both the
//! bulk inserts and the filtered select vary in shape per call. Every value is
//! a bound parameter.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use shipments_core::{AddressId, ShipmentFilter, ShipmentInput, TrackingNumber};

use super::{RepositoryError, ShipmentRepository};
use crate::models::Shipment;

/// Rows per bulk statement, keeping bind parameters well under the protocol limit.
const BATCH_SIZE: usize = 100;

const SHIPMENT_COLUMNS: &str = "tracking_no, address_id, shipment_date, length, width, height, \
                                weight, price_amt, price_currency, carrier";

/// Internal row type pairing an input position with its address id.
#[derive(Debug, sqlx::FromRow)]
struct AddressIdRow {
    ord: i32,
    id: AddressId,
}

/// Repository for shipment database operations.
#[derive(Debug, Clone)]
pub struct PgShipmentRepository {
    pool: PgPool,
}

impl PgShipmentRepository {
    /// Create a new shipment repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShipmentRepository for PgShipmentRepository {
    async fn insert_shipments(
        &self,
        shipments: &[ShipmentInput],
    ) -> Result<Vec<TrackingNumber>, RepositoryError> {
        if shipments.is_empty() {
            return Ok(Vec::new());
        }

        // The address CTE casts to column types, which would truncate silently.
        if let Some((index, field)) = shipments
            .iter()
            .enumerate()
            .find_map(|(i, s)| s.oversized_field().map(|field| (i, field)))
        {
            return Err(RepositoryError::FieldTooLong { index, field });
        }

        // Dropping `tx` on an early return rolls the whole batch back.
        let mut tx = self.pool.begin().await.map_err(RepositoryError::Insertion)?;
        let mut tracking_numbers = Vec::with_capacity(shipments.len());

        for chunk in shipments.chunks(BATCH_SIZE) {
            let address_ids = upsert_addresses(&mut tx, chunk).await?;
            // Generated here so they line up with the input rows.
            let chunk_numbers: Vec<TrackingNumber> = chunk
                .iter()
                .map(|_| TrackingNumber::new(Uuid::new_v4()))
                .collect();

            let mut insert = QueryBuilder::<Postgres>::new(
                "INSERT INTO shipments (tracking_no, address_id, shipment_date, length, width, \
                 height, weight, price_amt, price_currency, carrier) ",
            );
            insert.push_values(
                chunk.iter().zip(address_ids).zip(&chunk_numbers),
                |mut row, ((s, address_id), tracking_no)| {
                    row.push_bind(*tracking_no)
                        .push_bind(address_id)
                        .push_bind(s.shipment_date)
                        .push_bind(s.length)
                        .push_bind(s.width)
                        .push_bind(s.height)
                        .push_bind(s.weight)
                        .push_bind(s.price_amt)
                        .push_bind(s.price_currency.as_str())
                        .push_bind(s.carrier.as_str());
                },
            );

            let inserted = insert
                .build()
                .execute(&mut *tx)
                .await
                .map_err(RepositoryError::Insertion)?;
            if usize::try_from(inserted.rows_affected()).ok() != Some(chunk.len()) {
                return Err(RepositoryError::DataCorruption(format!(
                    "inserted {} shipments for {} rows",
                    inserted.rows_affected(),
                    chunk.len()
                )));
            }
            tracking_numbers.extend(chunk_numbers);
        }

        tx.commit().await.map_err(RepositoryError::Insertion)?;
        tracing::debug!(count = tracking_numbers.len(), "Inserted shipments");

        Ok(tracking_numbers)
    }

    async fn fetch_shipments(
        &self,
        filter: &ShipmentFilter,
    ) -> Result<Vec<Shipment>, RepositoryError> {
        let mut query = select_shipments(filter);

        let rows = query
            .build_query_as::<Shipment>()
            .fetch_all(&self.pool)
            .await
            .map_err(RepositoryError::Fetch)?;

        tracing::debug!(count = rows.len(), "Fetched shipments");
        Ok(rows)
    }
}

/// Upsert the addresses of `chunk` and return one id per input row, in order.
///
/// Input rows are numbered and cast to the column types before the upsert, and
/// the returned rows are joined back on those canonical values. Repeated
/// addresses within a chunk are inserted once and map to the same id.
async fn upsert_addresses(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    chunk: &[ShipmentInput],
) -> Result<Vec<AddressId>, RepositoryError> {
    let mut upsert = QueryBuilder::<Postgres>::new(
        "WITH raw (ord, addr_line_1, addr_line_2, postal_code, city, country_code) AS (",
    );
    upsert.push_values(chunk.iter().enumerate(), |mut row, (ord, shipment)| {
        let key = shipment.address_key();
        // Chunks never exceed BATCH_SIZE rows.
        row.push_bind(i32::try_from(ord).unwrap_or(i32::MAX))
            .push_bind(key.addr_line_1)
            .push_bind(key.addr_line_2)
            .push_bind(key.postal_code)
            .push_bind(key.city)
            .push_bind(key.country_code);
    });
    upsert.push(
        r"),
        input AS (
            SELECT ord,
                   CAST(addr_line_1 AS VARCHAR(255)) AS addr_line_1,
                   CAST(addr_line_2 AS VARCHAR(255)) AS addr_line_2,
                   CAST(postal_code AS VARCHAR(50)) AS postal_code,
                   CAST(city AS VARCHAR(100)) AS city,
                   CAST(country_code AS CHAR(2)) AS country_code
            FROM raw
        ),
        upserted AS (
            INSERT INTO shipment_addresses (addr_line_1, addr_line_2, postal_code, city, country_code)
            SELECT DISTINCT addr_line_1, addr_line_2, postal_code, city, country_code FROM input
            ON CONFLICT (addr_line_1, addr_line_2, postal_code, city, country_code)
            DO UPDATE SET addr_line_1 = EXCLUDED.addr_line_1
            RETURNING id, addr_line_1, addr_line_2, postal_code, city, country_code
        )
        SELECT input.ord, upserted.id
        FROM input
        JOIN upserted
          ON upserted.addr_line_1 = input.addr_line_1
         AND upserted.addr_line_2 IS NOT DISTINCT FROM input.addr_line_2
         AND upserted.postal_code = input.postal_code
         AND upserted.city = input.city
         AND upserted.country_code = input.country_code
        ORDER BY input.ord",
    );

    let rows = upsert
        .build_query_as::<AddressIdRow>()
        .fetch_all(&mut **tx)
        .await
        .map_err(RepositoryError::Insertion)?;

    let in_order = rows
        .iter()
        .enumerate()
        .all(|(i, row)| usize::try_from(row.ord).is_ok_and(|ord| ord == i));
    if rows.len() != chunk.len() || !in_order {
        return Err(RepositoryError::DataCorruption(format!(
            "address upsert returned {} ids for {} rows",
            rows.len(),
            chunk.len()
        )));
    }

    Ok(rows.into_iter().map(|row| row.id).collect())
}

/// Build the filtered shipment select. Conditions are joined with `AND`.
fn select_shipments(filter: &ShipmentFilter) -> QueryBuilder<'_, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {SHIPMENT_COLUMNS} FROM shipments"));
    let mut keyword = " WHERE ";

    if let Some(range) = filter.date {
        query
            .push(keyword)
            .push("shipment_date BETWEEN ")
            .push_bind(range.start)
            .push(" AND ")
            .push_bind(range.end);
        keyword = " AND ";
    }

    if let Some(range) = filter.price {
        query
            .push(keyword)
            .push("price_amt BETWEEN ")
            .push_bind(range.start)
            .push(" AND ")
            .push_bind(range.end);
        keyword = " AND ";
    }

    if let Some(carrier) = filter.carrier.as_deref() {
        query.push(keyword).push("carrier = ").push_bind(carrier);
    }

    query
}
