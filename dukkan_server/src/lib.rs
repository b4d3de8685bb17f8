//! # Dukkan server
//! This crate hosts the HTTP surface of the Dukkan order-fulfillment backend. It is responsible for:
//! * serving the cart, order, payment, and notification routes,
//! * validating webhook signatures before any payment mutation,
//! * streaming live events to connected clients over SSE.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! The business logic itself lives in `dukkan_engine`; handlers here unwrap the transport, call an engine API, and
//! map engine errors to HTTP statuses.

pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod payment_routes;
pub mod proof_store;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
