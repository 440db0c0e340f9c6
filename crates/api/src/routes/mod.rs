//! HTTP route handlers for the shipments API.
//!
//! # Route Structure
//!
//! ```text
//! POST /shipments/             - Record a batch of shipments
//! GET  /shipments/             - List shipments (?carrier=&date=start:end&price=start:end)
//! ```
//!
//! Both routes also answer without the trailing slash. Health checks are
//! mounted by the binary.

pub mod shipments;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create the shipment routes router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/shipments/",
            get(shipments::list).post(shipments::create),
        )
        .route("/shipments", get(shipments::list).post(shipments::create))
}
