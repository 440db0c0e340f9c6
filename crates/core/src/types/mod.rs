//! Core types for the shipments service.

pub mod filter;
pub mod id;
pub mod shipment;

pub use filter::{DateRange, FILTER_KEYS, PriceRange, ShipmentFilter};
pub use id::*;
pub use shipment::{AddressKey, FIELD_WIDTHS, ShipmentInput};
