//! # Donation Webhook Server
//! This crate hosts the HTTP surface of the donation webhook gateway. It is responsible for:
//! * Listening for incoming webhook notifications from payment gateways.
//! * Handing each raw request to the engine's dispatcher, which validates, interprets and processes it.
//! * Writing the engine's response descriptor back as the HTTP response.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook/{source}`: The webhook route. `{source}` selects the registered receiver, e.g. `/webhook/stripe`.
pub mod cli;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
