use std::{env, net::IpAddr, time::Duration};

use log::*;
use shopify_tools::ShopifyConfig as ShopifyApiConfig;
use ssg_common::{env_flag, env_u64, Secret};
use stock_sync_engine::sync_objects::SyncOptions;

const DEFAULT_SSG_HOST: &str = "127.0.0.1";
const DEFAULT_SSG_PORT: u16 = 8460;
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 900;
const DEFAULT_ADJUSTMENT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ADJUSTMENT_CONCURRENCY: u64 = 4;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Time between two scheduled reconciliation sweeps.
    pub reconcile_interval: Duration,
    /// Timeout and concurrency bounds on calls to the platform.
    pub sync_options: SyncOptions,
    /// Shopify webhook and Admin API configuration
    pub shopify_config: ShopifyConfig,
}

#[derive(Clone, Debug)]
pub struct ShopifyConfig {
    /// The shared secret Shopify signs webhook bodies with.
    pub hmac_secret: Secret<String>,
    /// If false, webhook signatures are not checked. **DANGER**, for local development only.
    pub hmac_checks: bool,
    /// If supplied, requests against /shopify endpoints will be checked against a whitelist of Shopify IP addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
    pub api: ShopifyApiConfig,
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self {
            hmac_secret: Secret::default(),
            hmac_checks: true,
            whitelist: None,
            api: ShopifyApiConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SSG_HOST.to_string(),
            port: DEFAULT_SSG_PORT,
            database_url: String::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            reconcile_interval: Duration::from_secs(DEFAULT_RECONCILE_INTERVAL_SECS),
            sync_options: SyncOptions::default(),
            shopify_config: ShopifyConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SSG_HOST").ok().unwrap_or_else(|| DEFAULT_SSG_HOST.into());
        let port = env::var("SSG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SSG_PORT. {e} Using the default, {DEFAULT_SSG_PORT}, instead."
                    );
                    DEFAULT_SSG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SSG_PORT);
        let database_url = env::var("SSG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SSG_DATABASE_URL is not set. Please set it to the URL for the stock ledger database.");
            String::default()
        });
        let shopify_config = ShopifyConfig::from_env_or_defaults();
        let use_x_forwarded_for = env_flag("SSG_USE_X_FORWARDED_FOR", false);
        let use_forwarded = env_flag("SSG_USE_FORWARDED", false);
        let reconcile_interval =
            Duration::from_secs(env_u64("SSG_RECONCILE_INTERVAL_SECS", DEFAULT_RECONCILE_INTERVAL_SECS));
        let sync_options = configure_sync_options();
        Self {
            host,
            port,
            database_url,
            use_x_forwarded_for,
            use_forwarded,
            reconcile_interval,
            sync_options,
            shopify_config,
        }
    }
}

impl ShopifyConfig {
    pub fn from_env_or_defaults() -> Self {
        let hmac_secret = env::var("SSG_SHOPIFY_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SSG_SHOPIFY_HMAC_SECRET is not set. Please set it to the webhook signing secret for your Shopify \
                 app."
            );
            String::default()
        });
        let hmac_secret = Secret::new(hmac_secret);
        let hmac_checks = env_flag("SSG_SHOPIFY_HMAC_CHECKS", true);
        if !hmac_checks {
            warn!(
                "🚨️ Webhook signature checks are DISABLED. Anyone who can reach the server can change the stock \
                 ledger. Never run like this in production. 🚨️"
            );
        }
        let whitelist = env::var("SSG_SHOPIFY_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The Shopify IP whitelist was configured, but is empty.  The server will run, but won't \
                     authorise any Shopify incoming requests."
                );
            },
            None => {
                info!("🪛️ No Shopify IP whitelist is set. Only HMAC validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Shopify IP whitelist: {addrs}");
            },
        }
        Self {
            hmac_secret,
            hmac_checks,
            whitelist,
            api: ShopifyApiConfig::new_from_env_or_default(),
        }
    }
}

/// Parses a comma-separated list of IP addresses. "none", "false" and "0" disable the whitelist. Invalid entries are
/// logged and skipped.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Shopify IP whitelist is disabled. If this is not what you want, set SSG_SHOPIFY_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(e) => {
                warn!("🪛️ Ignoring invalid IP address ({s}) in SSG_SHOPIFY_IP_WHITELIST: {e}");
                None
            },
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

fn configure_sync_options() -> SyncOptions {
    let timeout = env_u64("SSG_ADJUSTMENT_TIMEOUT_SECS", DEFAULT_ADJUSTMENT_TIMEOUT_SECS);
    let concurrency = env_u64("SSG_ADJUSTMENT_CONCURRENCY", DEFAULT_ADJUSTMENT_CONCURRENCY);
    debug!("🪛️ Platform calls time out after {timeout}s, with up to {concurrency} in flight per batch");
    SyncOptions { platform_timeout: Duration::from_secs(timeout), concurrency: concurrency as usize }
}
