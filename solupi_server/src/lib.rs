//! # SolUPI server
//! This crate hosts the server for the SolUPI on-ramp. It is responsible for:
//! * Serving the order API used by the front end.
//! * Receiving bank notification emails, either from the webhook or by watching a Maildir, and passing them to the
//!   ingestion pipeline.
//! * Paying out USDC on Solana once a payment is matched to an order.
//! * Periodically reconciling orders that got stuck mid-payout.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/orders`: Create (POST) and list (GET) orders.
//! * `/api/orders/{id}`: Fetch (GET) or cancel (DELETE) an order.
//! * `/api/orders/{id}/reference`: Attach the UPI reference of a payment to an order (PUT).
//! * `/api/webhooks/email-parse`: Submit the body of a bank notification email (POST). Requests must be signed with
//!   the shared webhook secret. See [middleware](middleware/index.html).
//! * `/api/prices`: The current USDC buy rate (GET).

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod mail_watcher;
pub mod middleware;
pub mod reconciliation_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
