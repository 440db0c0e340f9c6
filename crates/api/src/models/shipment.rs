//! Stored shipment rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shipments_core::{AddressId, TrackingNumber};

/// A persisted shipment, in table column order.
///
/// Decimals serialize as strings so amounts keep their stored scale
/// (`"100.00"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Shipment {
    /// Store-generated shipment identifier.
    pub tracking_no: TrackingNumber,
    /// Destination address row.
    pub address_id: AddressId,
    pub shipment_date: NaiveDate,
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub weight: Decimal,
    pub price_amt: Decimal,
    pub price_currency: String,
    pub carrier: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_shipment_serializes_as_flat_object() {
        let shipment = Shipment {
            tracking_no: TrackingNumber::new(Uuid::nil()),
            address_id: AddressId::new(Uuid::nil()),
            shipment_date: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
            length: Decimal::new(1500, 2),
            width: Decimal::new(1000, 2),
            height: Decimal::new(800, 2),
            weight: Decimal::new(1000, 2),
            price_amt: Decimal::new(10000, 2),
            price_currency: "USD".to_string(),
            carrier: "ups".to_string(),
        };

        let value = serde_json::to_value(&shipment).unwrap();
        assert_eq!(value["tracking_no"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(value["shipment_date"], "2020-01-15");
        assert_eq!(value["price_amt"], "100.00");
        assert_eq!(value["carrier"], "ups");
    }
}
