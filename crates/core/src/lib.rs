//! Shipments Core - Shared types library.
//!
//! This crate provides the types and validation used across the shipments
//! components:
//! - `api` - HTTP service recording and querying shipments
//! - `cli` - Command-line tools for schema bootstrap and log tailing
//!
//! # Architecture
//!
//! The core crate contains only types and parsing - no I/O, no database access,
//! no HTTP. Request payloads are turned into fully-typed values here before any
//! store is touched.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, validated shipment records, and fetch filters
//! - [`validation`] - Batch validation of loosely-typed JSON records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{ValidationError, parse_shipments};
