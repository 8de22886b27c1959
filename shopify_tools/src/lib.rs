//! # Shopify tools
//!
//! A thin client for the parts of the Shopify Admin API that the stock sync gateway needs: reading the `available`
//! quantity of an inventory item at a location, and applying delta adjustments to it.
mod api;
mod config;
mod error;

pub mod data_objects;
pub mod helpers;

pub use api::ShopifyApi;
pub use config::ShopifyConfig;
pub use data_objects::{InventoryAdjustment, InventoryLevelWebhook};
pub use error::ShopifyApiError;
