//! # Stock sync gateway server
//! This crate hosts the server for the stock sync gateway. It is responsible for:
//! * Listening for inventory webhooks from Shopify, verifying their signatures, and handing them to the engine.
//! * Exposing the stock check, deduct and restore endpoints that billing calls when invoices are created or voided.
//! * Running the periodic reconciliation sweep against Shopify.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/shopify/webhook/inventory`: Shopify `inventory_levels/update` webhooks. HMAC-checked.
//! * `/api/stock/{check,deduct,restore}`: Billing-facing stock endpoints.
//! * `/api/inventory/{product_id}[/link|/sync|/resync|/log]`, `/api/events/{event_id}`, `/api/reconcile`:
//!   Administration.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod reconcile_worker;
pub mod routes;
pub mod server;
pub mod shopify_routes;

#[cfg(test)]
mod endpoint_tests;
