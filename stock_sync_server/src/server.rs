use std::time::Duration;

use actix_web::{
    dev::{HttpServiceFactory, Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    web::ServiceConfig,
    App,
    HttpServer,
};
use futures::{future::ok, FutureExt};
use log::*;
use stock_sync_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    sync_objects::SyncOptions,
    AdjustmentApi,
    InboundSyncApi,
    InventoryApi,
    InventoryPlatform,
    ReconciliationApi,
    SqliteDatabase,
    StockSyncDatabase,
};

use crate::{
    config::{ServerConfig, ShopifyConfig},
    errors::{ServerError, WebhookAuthError},
    helpers::get_remote_ip,
    integrations::shopify::ShopifyInventory,
    middleware::HmacMiddlewareFactory,
    reconcile_worker::start_reconcile_worker,
    routes::{
        health,
        CheckStockRoute,
        DeductStockRoute,
        InboundEventRoute,
        InventoryByIdRoute,
        LinkProductRoute,
        ReconcileRoute,
        RestoreStockRoute,
        ResyncProductRoute,
        SyncLogRoute,
        ToggleSyncRoute,
    },
    shopify_routes::{InventoryWebhookRoute, SHOPIFY_HMAC_HEADER, SHOPIFY_TOPIC_HEADER, SHOPIFY_WEBHOOK_ID_HEADER},
};

pub const HOOK_BUFFER_SIZE: usize = 50;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    let platform = ShopifyInventory::new(config.shopify_config.api.clone())
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_logging_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _worker = start_reconcile_worker(
        db.clone(),
        platform.clone(),
        producers.clone(),
        config.sync_options,
        config.reconcile_interval,
    );
    let srv = create_server_instance(config, db, platform, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    platform: ShopifyInventory,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let db = db.clone();
        let platform = platform.clone();
        let producers = producers.clone();
        let options = config.sync_options;
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ssg::access_log"))
            .configure(|cfg| configure_api(cfg, db, platform, producers, options))
            .service(health)
            .service(shopify_scope::<SqliteDatabase>(
                &config.shopify_config,
                config.use_x_forwarded_for,
                config.use_forwarded,
            ))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers the engine APIs as app data, and the billing and admin routes under `/api`.
pub fn configure_api<B, P>(cfg: &mut ServiceConfig, db: B, platform: P, producers: EventProducers, options: SyncOptions)
where
    B: StockSyncDatabase + Clone + 'static,
    P: InventoryPlatform + Clone + 'static,
{
    let inbound_api = InboundSyncApi::new(db.clone(), producers.clone());
    let inventory_api = InventoryApi::new(db.clone());
    let adjustment_api = AdjustmentApi::new(db.clone(), platform.clone(), producers.clone(), options);
    let reconcile_api = ReconciliationApi::new(db, platform, producers, options);
    let api_scope = web::scope("/api")
        .service(CheckStockRoute::<B>::new())
        .service(DeductStockRoute::<B, P>::new())
        .service(RestoreStockRoute::<B, P>::new())
        .service(InventoryByIdRoute::<B>::new())
        .service(LinkProductRoute::<B>::new())
        .service(ToggleSyncRoute::<B>::new())
        .service(ResyncProductRoute::<B, P>::new())
        .service(SyncLogRoute::<B>::new())
        .service(InboundEventRoute::<B>::new())
        .service(ReconcileRoute::<B, P>::new());
    cfg.app_data(web::Data::new(inbound_api))
        .app_data(web::Data::new(inventory_api))
        .app_data(web::Data::new(adjustment_api))
        .app_data(web::Data::new(reconcile_api))
        .service(api_scope);
}

/// The `/shopify` scope: IP whitelist (if configured) first, then the webhook signature check.
pub fn shopify_scope<B: StockSyncDatabase + 'static>(
    config: &ShopifyConfig,
    use_x_forwarded_for: bool,
    use_forwarded: bool,
) -> impl HttpServiceFactory + 'static {
    let whitelist = config.whitelist.clone();
    let hmac = HmacMiddlewareFactory::new(SHOPIFY_HMAC_HEADER, config.hmac_secret.clone(), config.hmac_checks)
        .require_headers(&[SHOPIFY_TOPIC_HEADER, SHOPIFY_WEBHOOK_ID_HEADER]);
    web::scope("/shopify").service(InventoryWebhookRoute::<B>::new()).wrap(hmac).wrap_fn(move |req, srv| {
        let peer_ip = get_remote_ip(req.request(), use_x_forwarded_for, use_forwarded);
        let whitelisted = match (peer_ip, &whitelist) {
            (Some(ip), Some(whitelist)) => {
                debug!("🛍️️ Shopify webhook from {ip}");
                whitelist.contains(&ip)
            },
            (_, None) => true,
            (None, Some(_)) => {
                warn!("🛍️️ No IP address found in shopify remote peer request, denying access.");
                false
            },
        };
        if whitelisted {
            srv.call(req).boxed_local()
        } else {
            warn!("🛍️️ Rejecting webhook from {peer_ip:?}. It is not on the whitelist.");
            ok(req.error_response(ServerError::from(WebhookAuthError::ForbiddenPeer))).boxed_local()
        }
    })
}

/// Hooks that write ledger changes and failed adjustments to the log.
pub fn create_logging_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks
        .on_stock_changed(|ev| {
            Box::pin(async move {
                info!(
                    "📬️ Stock for {} changed from {} to {} ({} via {}, ref {})",
                    ev.product_id,
                    ev.old_stock,
                    ev.new_stock,
                    ev.action,
                    ev.source,
                    ev.reference_id.as_deref().unwrap_or("none")
                );
            })
        })
        .on_adjustment_failed(|ev| {
            Box::pin(async move {
                warn!(
                    "📬️ {} of {} x {} failed (ref {}). The platform and ledger may disagree until the next sweep. {}",
                    ev.action,
                    ev.quantity,
                    ev.product_id,
                    ev.reference_id.as_deref().unwrap_or("none"),
                    ev.error
                );
            })
        });
    EventHandlers::new(HOOK_BUFFER_SIZE, hooks)
}
