//! Query filters for listing shipments.
//!
//! Filters come from URL query parameters:
//!
//! ```text
//! carrier=ups                  exact carrier match
//! date=2020-01-01:2020-01-31   inclusive shipment date range
//! price=100:500                inclusive price range
//! ```
//!
//! All present filters must hold for a shipment to match.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::validation::{ValidationError, parse_date, parse_decimal};

/// The only query keys accepted by the shipment listing.
pub const FILTER_KEYS: [&str; 3] = ["carrier", "date", "price"];

/// Inclusive range of shipment dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Inclusive range of shipment prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    pub start: Decimal,
    pub end: Decimal,
}

/// Filters applied when fetching shipments. The default matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipmentFilter {
    pub carrier: Option<String>,
    pub date: Option<DateRange>,
    pub price: Option<PriceRange>,
}

impl ShipmentFilter {
    /// Returns true if `key` is one of [`FILTER_KEYS`].
    #[must_use]
    pub fn is_known_key(key: &str) -> bool {
        FILTER_KEYS.contains(&key)
    }

    /// Build a filter from query parameters.
    ///
    /// When a key is repeated, the first occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownFilter`] for a key outside
    /// [`FILTER_KEYS`], [`ValidationError::MalformedRange`] if a range is not
    /// exactly two `:`-separated parts, and [`ValidationError::InvalidBound`]
    /// if a bound does not parse.
    pub fn from_params<I, K, V>(params: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Self::default();

        for (key, value) in params {
            let value = value.as_ref();
            match key.as_ref() {
                "carrier" => {
                    if filter.carrier.is_none() {
                        filter.carrier = Some(value.to_owned());
                    }
                }
                "date" => {
                    if filter.date.is_none() {
                        let (start, end) = parse_range("date", value, parse_date)?;
                        filter.date = Some(DateRange { start, end });
                    }
                }
                "price" => {
                    if filter.price.is_none() {
                        let (start, end) = parse_range("price", value, parse_decimal)?;
                        filter.price = Some(PriceRange { start, end });
                    }
                }
                other => return Err(ValidationError::UnknownFilter(other.to_owned())),
            }
        }

        Ok(filter)
    }

    /// Check a shipment's filterable fields against every set filter.
    #[must_use]
    pub fn matches(&self, shipment_date: NaiveDate, price_amt: Decimal, carrier: &str) -> bool {
        self.carrier.as_deref().is_none_or(|c| c == carrier)
            && self
                .date
                .is_none_or(|r| (r.start..=r.end).contains(&shipment_date))
            && self
                .price
                .is_none_or(|r| (r.start..=r.end).contains(&price_amt))
    }
}

/// Split `start:end` and parse both bounds.
fn parse_range<T>(
    key: &'static str,
    value: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<(T, T), ValidationError> {
    let mut parts = value.split(':');
    let (Some(start), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ValidationError::MalformedRange {
            key,
            value: value.to_owned(),
        });
    };

    let bound = |raw: &str| {
        parse(raw).ok_or_else(|| ValidationError::InvalidBound {
            key,
            value: raw.to_owned(),
        })
    };

    Ok((bound(start)?, bound(end)?))
}
