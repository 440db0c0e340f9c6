//! Validation of loosely-typed shipment payloads.
//!
//! Request bodies arrive as arbitrary JSON. [`parse_shipments`] turns a batch
//! of JSON records into [`ShipmentInput`] values, or rejects the whole batch
//! on the first record that does not fit.
//!
//! ## Field rules
//!
//! - `shipment_date` - string in `YYYY-MM-DD` form
//! - `addr_line_1`, `postal_code`, `city`, `country_code`, `price_currency`,
//!   `carrier` - required strings
//! - `addr_line_2` - optional string (absent or `null` means none)
//! - text fields are limited to their column widths ([`FIELD_WIDTHS`])
//! - `length`, `width`, `height`, `weight`, `price_amt` - number or numeric
//!   string, strictly positive
//!
//! Unknown fields are ignored. Carrier membership is left to the store.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::types::{FIELD_WIDTHS, ShipmentInput};

/// Calendar date format accepted for shipment dates and date filters.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised when client input cannot be turned into typed values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The payload is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    MalformedJson(String),
    /// The payload is not a JSON array of records.
    #[error("payload must be an array of shipment records")]
    NotAnArray,
    /// A record is not a JSON object.
    #[error("record {index}: expected an object")]
    NotAnObject {
        /// Position of the record in the batch.
        index: usize,
    },
    /// A required field is absent.
    #[error("record {index}: missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
    /// A field has the wrong JSON type.
    #[error("record {index}: field `{field}` must be {expected}")]
    InvalidType {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },
    /// A date field is not a valid `YYYY-MM-DD` date.
    #[error("record {index}: field `{field}` is not a valid date: {value}")]
    InvalidDate {
        index: usize,
        field: &'static str,
        value: String,
    },
    /// A numeric field could not be converted to a decimal.
    #[error("record {index}: field `{field}` is not a valid decimal")]
    InvalidDecimal { index: usize, field: &'static str },
    /// A text field is wider than its column.
    #[error("record {index}: field `{field}` must be at most {max} characters")]
    TooLong {
        index: usize,
        field: &'static str,
        max: usize,
    },
    /// A numeric field is zero or negative.
    #[error("record {index}: field `{field}` must be greater than 0")]
    NotPositive { index: usize, field: &'static str },
    /// A query filter key is not one of `carrier`, `date`, `price`.
    #[error("unknown filter `{0}`")]
    UnknownFilter(String),
    /// A range filter is not of the form `start:end`.
    #[error("filter `{key}` must be of the form start:end, got `{value}`")]
    MalformedRange { key: &'static str, value: String },
    /// A range filter bound could not be parsed.
    #[error("filter `{key}` has an invalid bound `{value}`")]
    InvalidBound { key: &'static str, value: String },
}

/// Validate a batch of shipment records.
///
/// Records are validated in order and the first failure rejects the batch.
/// An empty batch yields an empty vector.
///
/// # Errors
///
/// Returns a [`ValidationError`] describing the first offending record and
/// field.
pub fn parse_shipments(records: &[Value]) -> Result<Vec<ShipmentInput>, ValidationError> {
    records
        .iter()
        .enumerate()
        .map(|(index, value)| parse_shipment(index, value))
        .collect()
}

fn parse_shipment(index: usize, value: &Value) -> Result<ShipmentInput, ValidationError> {
    let fields = value
        .as_object()
        .ok_or(ValidationError::NotAnObject { index })?;
    let record = Record { index, fields };

    let shipment = ShipmentInput {
        shipment_date: record.date("shipment_date")?,
        addr_line_1: record.required_str("addr_line_1")?,
        addr_line_2: record.optional_str("addr_line_2")?,
        postal_code: record.required_str("postal_code")?,
        city: record.required_str("city")?,
        country_code: record.required_str("country_code")?,
        length: record.positive_decimal("length")?,
        width: record.positive_decimal("width")?,
        height: record.positive_decimal("height")?,
        weight: record.positive_decimal("weight")?,
        price_amt: record.positive_decimal("price_amt")?,
        price_currency: record.required_str("price_currency")?,
        carrier: record.required_str("carrier")?,
    };

    if let Some(&(field, max)) = shipment
        .oversized_field()
        .and_then(|field| FIELD_WIDTHS.iter().find(|(f, _)| *f == field))
    {
        return Err(ValidationError::TooLong { index, field, max });
    }

    Ok(shipment)
}

/// Parse a `YYYY-MM-DD` date.
///
/// Returns `None` if the input is not a valid calendar date.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Parse a decimal from its textual form, accepting plain and scientific notation.
#[must_use]
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// One record of a batch, with its position for error reporting.
struct Record<'a> {
    index: usize,
    fields: &'a Map<String, Value>,
}

impl Record<'_> {
    fn get(&self, field: &'static str) -> Result<&Value, ValidationError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Err(ValidationError::MissingField {
                index: self.index,
                field,
            }),
            Some(value) => Ok(value),
        }
    }

    fn required_str(&self, field: &'static str) -> Result<String, ValidationError> {
        self.get(field)?
            .as_str()
            .map(str::to_owned)
            .ok_or(ValidationError::InvalidType {
                index: self.index,
                field,
                expected: "a string",
            })
    }

    fn optional_str(&self, field: &'static str) -> Result<Option<String>, ValidationError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(ValidationError::InvalidType {
                index: self.index,
                field,
                expected: "a string or null",
            }),
        }
    }

    fn date(&self, field: &'static str) -> Result<NaiveDate, ValidationError> {
        let raw = self
            .get(field)?
            .as_str()
            .ok_or(ValidationError::InvalidType {
                index: self.index,
                field,
                expected: "a date string",
            })?;

        parse_date(raw).ok_or_else(|| ValidationError::InvalidDate {
            index: self.index,
            field,
            value: raw.to_owned(),
        })
    }

    fn positive_decimal(&self, field: &'static str) -> Result<Decimal, ValidationError> {
        let parsed = match self.get(field)? {
            Value::Number(n) => parse_decimal(&n.to_string()),
            Value::String(s) => parse_decimal(s),
            _ => {
                return Err(ValidationError::InvalidType {
                    index: self.index,
                    field,
                    expected: "a number",
                });
            }
        };

        let value = parsed.ok_or(ValidationError::InvalidDecimal {
            index: self.index,
            field,
        })?;

        if value <= Decimal::ZERO {
            return Err(ValidationError::NotPositive {
                index: self.index,
                field,
            });
        }

        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid_record() -> Value {
        json!({
            "shipment_date": "2022-07-15",
            "addr_line_1": "123 Main St",
            "addr_line_2": "Apt 4",
            "postal_code": "12345",
            "city": "Anytown",
            "country_code": "US",
            "length": 15,
            "width": 10,
            "height": 8,
            "weight": 10,
            "price_amt": 100,
            "price_currency": "USD",
            "carrier": "dhl-express"
        })
    }

    fn without(field: &str) -> Value {
        let mut record = valid_record();
        record.as_object_mut().unwrap().remove(field);
        record
    }

    fn with(field: &str, value: Value) -> Value {
        let mut record = valid_record();
        record.as_object_mut().unwrap().insert(field.to_string(), value);
        record
    }

    #[test]
    fn test_parse_valid_record() {
        let parsed = parse_shipments(&[valid_record()]).unwrap();
        assert_eq!(parsed.len(), 1);

        let shipment = &parsed[0];
        assert_eq!(
            shipment.shipment_date,
            NaiveDate::from_ymd_opt(2022, 7, 15).unwrap()
        );
        assert_eq!(shipment.addr_line_2.as_deref(), Some("Apt 4"));
        assert_eq!(shipment.length, Decimal::new(15, 0));
        assert_eq!(shipment.price_amt, Decimal::new(100, 0));
        assert_eq!(shipment.carrier, "dhl-express");
    }

    #[test]
    fn test_empty_batch_is_accepted() {
        assert_eq!(parse_shipments(&[]).unwrap(), Vec::new());
    }

    #[test]
    fn test_numeric_strings_and_fractions_are_accepted() {
        let mut record = with("weight", json!("2.75"));
        record["price_amt"] = json!(19.99);
        let parsed = parse_shipments(&[record]).unwrap();
        assert_eq!(parsed[0].weight, Decimal::new(275, 2));
        assert_eq!(parsed[0].price_amt, Decimal::new(1999, 2));
    }

    #[test]
    fn test_missing_second_line_is_none() {
        let parsed = parse_shipments(&[without("addr_line_2")]).unwrap();
        assert_eq!(parsed[0].addr_line_2, None);

        let parsed = parse_shipments(&[with("addr_line_2", Value::Null)]).unwrap();
        assert_eq!(parsed[0].addr_line_2, None);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let parsed = parse_shipments(&[with("gift_wrap", json!(true))]).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_missing_price_is_rejected() {
        assert_eq!(
            parse_shipments(&[without("price_amt")]),
            Err(ValidationError::MissingField {
                index: 0,
                field: "price_amt"
            })
        );
    }

    #[test]
    fn test_non_positive_price_is_rejected() {
        assert_eq!(
            parse_shipments(&[with("price_amt", json!(0))]),
            Err(ValidationError::NotPositive {
                index: 0,
                field: "price_amt"
            })
        );
        assert!(parse_shipments(&[with("price_amt", json!(-3.5))]).is_err());
    }

    #[test]
    fn test_non_numeric_dimension_is_rejected() {
        assert_eq!(
            parse_shipments(&[with("length", json!("long"))]),
            Err(ValidationError::InvalidDecimal {
                index: 0,
                field: "length"
            })
        );
        assert!(matches!(
            parse_shipments(&[with("height", json!([1]))]),
            Err(ValidationError::InvalidType { field: "height", .. })
        ));
    }

    #[test]
    fn test_bad_date_is_rejected() {
        assert!(matches!(
            parse_shipments(&[with("shipment_date", json!("15/07/2022"))]),
            Err(ValidationError::InvalidDate { .. })
        ));
        assert!(matches!(
            parse_shipments(&[with("shipment_date", json!("2022-02-30"))]),
            Err(ValidationError::InvalidDate { .. })
        ));
        assert!(matches!(
            parse_shipments(&[with("shipment_date", json!(20_220_715))]),
            Err(ValidationError::InvalidType { .. })
        ));
    }

    #[test]
    fn test_non_string_address_is_rejected() {
        assert!(matches!(
            parse_shipments(&[with("postal_code", json!(12345))]),
            Err(ValidationError::InvalidType {
                field: "postal_code",
                ..
            })
        ));
    }

    #[test]
    fn test_over_wide_text_is_rejected() {
        assert_eq!(
            parse_shipments(&[with("country_code", json!("USA"))]),
            Err(ValidationError::TooLong {
                index: 0,
                field: "country_code",
                max: 2
            })
        );
        assert!(matches!(
            parse_shipments(&[with("postal_code", json!("9".repeat(60)))]),
            Err(ValidationError::TooLong {
                field: "postal_code",
                max: 50,
                ..
            })
        ));
        assert!(parse_shipments(&[with("postal_code", json!("9".repeat(50)))]).is_ok());
        assert!(parse_shipments(&[with("price_currency", json!("USDX"))]).is_err());
    }

    #[test]
    fn test_one_bad_record_rejects_batch() {
        let batch = [valid_record(), without("carrier"), valid_record()];
        assert_eq!(
            parse_shipments(&batch),
            Err(ValidationError::MissingField {
                index: 1,
                field: "carrier"
            })
        );
    }

    #[test]
    fn test_non_object_record_is_rejected() {
        assert_eq!(
            parse_shipments(&[json!("shipment_date")]),
            Err(ValidationError::NotAnObject { index: 0 })
        );
    }

    #[test]
    fn test_parse_decimal_scientific() {
        assert_eq!(parse_decimal("1e3"), Some(Decimal::new(1000, 0)));
        assert_eq!(parse_decimal(" 12.50 "), Some(Decimal::new(1250, 2)));
        assert_eq!(parse_decimal("abc"), None);
    }
}
