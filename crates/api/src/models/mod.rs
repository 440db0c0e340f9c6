//! Domain models for the shipments service.
//!
//! Inputs are validated in `shipments-core`; the types here describe what the
//! store hands back.

pub mod shipment;

pub use shipment::Shipment;
