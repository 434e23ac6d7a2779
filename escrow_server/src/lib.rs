//! # Marketplace escrow server
//!
//! The HTTP surface over the escrow engine. It is responsible for:
//! * Authenticating callers and dispatching the checkout, shipment and dispute endpoints.
//! * Receiving and verifying payment and connected-account webhooks from the processor.
//! * Exposing the scheduled-job trigger endpoints, and optionally running those jobs itself.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more
//! information.
pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod jobs;
pub mod routes;
pub mod server;
pub mod webhook_routes;
pub mod worker;

#[cfg(test)]
mod endpoint_tests;
