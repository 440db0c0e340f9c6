//! Shipments service library.
//!
//! The binary in `main.rs` wires these modules into an HTTP server; the CLI
//! reuses the configuration and schema bootstrap.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
