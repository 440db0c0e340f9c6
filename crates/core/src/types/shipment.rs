//! Validated shipment records.
//!
//! These are the fully-typed values produced by [`crate::validation`]. They are
//! not row types: ids are generated by the store and appear only in stored rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Widest value, in characters, each text column accepts.
pub const FIELD_WIDTHS: [(&str, usize); 7] = [
    ("addr_line_1", 255),
    ("addr_line_2", 255),
    ("postal_code", 50),
    ("city", 100),
    ("country_code", 2),
    ("price_currency", 3),
    ("carrier", 11),
];

/// A shipment that passed validation and is ready to be persisted.
///
/// `carrier`, `country_code` and `price_currency` are kept as plain strings;
/// their allowed values are enforced by the store schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentInput {
    /// Date the shipment was sent.
    pub shipment_date: NaiveDate,
    /// First address line.
    pub addr_line_1: String,
    /// Optional second address line.
    pub addr_line_2: Option<String>,
    /// Postal code of the destination.
    pub postal_code: String,
    /// Destination city.
    pub city: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub weight: Decimal,
    /// Shipping price, always greater than zero.
    pub price_amt: Decimal,
    /// ISO 4217 currency code of `price_amt`.
    pub price_currency: String,
    /// Carrier slug (`dhl-express`, `ups`, `fedex`).
    pub carrier: String,
}

impl ShipmentInput {
    /// The destination address tuple that identifies an address row.
    #[must_use]
    pub fn address_key(&self) -> AddressKey<'_> {
        AddressKey {
            addr_line_1: &self.addr_line_1,
            addr_line_2: self.addr_line_2.as_deref(),
            postal_code: &self.postal_code,
            city: &self.city,
            country_code: &self.country_code,
        }
    }

    /// The first text field longer than its column width, if any.
    #[must_use]
    pub fn oversized_field(&self) -> Option<&'static str> {
        FIELD_WIDTHS
            .iter()
            .find(|(field, width)| {
                self.text_field(field)
                    .is_some_and(|value| value.chars().count() > *width)
            })
            .map(|(field, _)| *field)
    }

    fn text_field(&self, field: &str) -> Option<&str> {
        match field {
            "addr_line_1" => Some(&self.addr_line_1),
            "addr_line_2" => self.addr_line_2.as_deref(),
            "postal_code" => Some(&self.postal_code),
            "city" => Some(&self.city),
            "country_code" => Some(&self.country_code),
            "price_currency" => Some(&self.price_currency),
            "carrier" => Some(&self.carrier),
            _ => None,
        }
    }
}

/// The uniqueness tuple of a shipment address.
///
/// Two shipments with equal keys share one address row. A missing second line
/// is part of the key, so `None` only equals `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressKey<'a> {
    pub addr_line_1: &'a str,
    pub addr_line_2: Option<&'a str>,
    pub postal_code: &'a str,
    pub city: &'a str,
    pub country_code: &'a str,
}
