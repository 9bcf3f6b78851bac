//! # ChainPay server
//! This module hosts the HTTP ingress for the ChainPay payment gateway. It is responsible for:
//! Listening for incoming blockchain payment notifications (generic and invoice-scoped webhooks).
//! Verifying the webhook signature against the configured shared secret.
//! Handing verified notifications to the reconciliation engine and reporting the outcome.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook`: A read-only probe describing the notification endpoint.
//! * `/webhook/payment`: The generic notification route; the invoice is resolved by deposit address.
//! * `/webhook/invoice/{invoice_id}`: The invoice-scoped notification route.
//! * `/api/...`: Read-only invoice and balance queries.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
