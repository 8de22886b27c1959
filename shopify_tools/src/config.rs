use std::time::Duration;

use log::*;
use ssg_common::{env_u64, Secret};

const DEFAULT_API_VERSION: &str = "2024-07";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct ShopifyConfig {
    /// The shop domain, e.g. "my-shop.myshopify.com"
    pub shop: String,
    pub admin_access_token: Secret<String>,
    pub api_version: String,
    /// Upper bound on any single HTTP round trip to the Admin API.
    pub request_timeout: Duration,
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self {
            shop: String::default(),
            admin_access_token: Secret::default(),
            api_version: DEFAULT_API_VERSION.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ShopifyConfig {
    pub fn new_from_env_or_default() -> Self {
        let shop = std::env::var("SSG_SHOPIFY_SHOP").unwrap_or_else(|_| {
            warn!("🪛️ SSG_SHOPIFY_SHOP not set, using (probably useless) default");
            "example.myshopify.com".to_string()
        });
        let api_version = std::env::var("SSG_SHOPIFY_API_VERSION").unwrap_or_else(|_| {
            warn!("🪛️ SSG_SHOPIFY_API_VERSION not set, using {DEFAULT_API_VERSION} as default");
            DEFAULT_API_VERSION.to_string()
        });
        let admin_access_token = Secret::new(std::env::var("SSG_SHOPIFY_ADMIN_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("🪛️ SSG_SHOPIFY_ADMIN_ACCESS_TOKEN not set, using (probably useless) default");
            "shpat_00000000000000".to_string()
        }));
        let timeout = env_u64("SSG_SHOPIFY_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS);
        Self { shop, admin_access_token, api_version, request_timeout: Duration::from_secs(timeout) }
    }
}
