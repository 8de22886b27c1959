//! Request handler definitions
//!
//! Define each route and its handler here. Handlers stay thin: they extract the request, call one engine API and
//! shape the response. Anything longer belongs in the engine.
//!
//! Every handler is async and only awaits database or platform calls, so a slow Shopify response never blocks the
//! worker thread. Outbound platform calls are bounded by the per-item timeout in [`SyncOptions`].
//!
//! [`SyncOptions`]: stock_sync_engine::sync_objects::SyncOptions
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use stock_sync_engine::{
    db_types::{ProductId, SyncSource},
    sync_objects::{AdjustmentBatch, AdjustmentKind},
    AdjustmentApi,
    InboundSyncApi,
    InventoryApi,
    InventoryPlatform,
    ReconciliationApi,
    StockLedger,
    StockSyncDatabase,
};

use crate::{
    data_objects::{LinkProductRequest, StockCheckRequest, StockCheckResponse, SyncLogParams, SyncToggleRequest},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Stock  ----------------------------------------------------
route!(check_stock => Post "/stock/check" impl StockLedger);
/// Checks requested quantities against the local ledger. Never calls the platform.
pub async fn check_stock<B: StockLedger>(
    body: web::Json<StockCheckRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST stock check for {} item(s)", request.products.len());
    let items = api.check_stock(&request.products).await;
    Ok(HttpResponse::Ok().json(StockCheckResponse { items }))
}

route!(deduct_stock => Post "/stock/deduct" impl StockLedger, InventoryPlatform);
/// Invoice created. The response is always 200; per-item failures are reported in the body.
pub async fn deduct_stock<B: StockLedger, P: InventoryPlatform>(
    body: web::Json<AdjustmentBatch>,
    api: web::Data<AdjustmentApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    adjust_stock(AdjustmentKind::Deduct, body.into_inner(), api.as_ref()).await
}

route!(restore_stock => Post "/stock/restore" impl StockLedger, InventoryPlatform);
/// Invoice voided. The response is always 200; per-item failures are reported in the body.
pub async fn restore_stock<B: StockLedger, P: InventoryPlatform>(
    body: web::Json<AdjustmentBatch>,
    api: web::Data<AdjustmentApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    adjust_stock(AdjustmentKind::Restore, body.into_inner(), api.as_ref()).await
}

async fn adjust_stock<B: StockLedger, P: InventoryPlatform>(
    kind: AdjustmentKind,
    batch: AdjustmentBatch,
    api: &AdjustmentApi<B, P>,
) -> Result<HttpResponse, ServerError> {
    if batch.products.is_empty() {
        return Err(ServerError::InvalidRequestBody("At least one product is required".into()));
    }
    debug!("💻️ POST {kind} of {} item(s) for {:?}", batch.products.len(), batch.reference_id);
    let result = api.adjust(kind, batch).await;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Inventory admin  ----------------------------------------------
route!(inventory_by_id => Get "/inventory/{product_id}" impl StockLedger);
pub async fn inventory_by_id<B: StockLedger>(
    path: web::Path<String>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = ProductId::from(path.into_inner());
    trace!("💻️ GET inventory for {product_id}");
    let product = api.fetch_inventory(&product_id).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(link_product => Put "/inventory/{product_id}/link" impl StockLedger);
pub async fn link_product<B: StockLedger>(
    path: web::Path<String>,
    body: web::Json<LinkProductRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = ProductId::from(path.into_inner());
    let request = body.into_inner();
    debug!("💻️ PUT link for {product_id}: {request:?}");
    let product = api.link_product(&product_id, request.external_link(), request.sync_enabled).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(toggle_sync => Post "/inventory/{product_id}/sync" impl StockLedger);
pub async fn toggle_sync<B: StockLedger>(
    path: web::Path<String>,
    body: web::Json<SyncToggleRequest>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = ProductId::from(path.into_inner());
    let product = api.set_sync_enabled(&product_id, body.enabled).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(resync_product => Post "/inventory/{product_id}/resync" impl StockLedger, InventoryPlatform);
/// Reconciles one product against the platform immediately.
pub async fn resync_product<B: StockLedger, P: InventoryPlatform>(
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = ProductId::from(path.into_inner());
    info!("💻️ Manual resync requested for {product_id}");
    let outcome = api.resync_product(&product_id).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(sync_log => Get "/inventory/{product_id}/log" impl StockLedger);
pub async fn sync_log<B: StockLedger>(
    path: web::Path<String>,
    params: web::Query<SyncLogParams>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = ProductId::from(path.into_inner());
    trace!("💻️ GET sync log for {product_id} (limit {:?})", params.limit);
    let entries = api.sync_log(&product_id, params.limit).await?;
    Ok(HttpResponse::Ok().json(entries))
}

route!(inbound_event => Get "/events/{event_id}" impl StockSyncDatabase);
pub async fn inbound_event<B: StockSyncDatabase>(
    path: web::Path<String>,
    api: web::Data<InboundSyncApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let event_id = path.into_inner();
    trace!("💻️ GET inbound event {event_id}");
    let event = api
        .fetch_event(&event_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("inbound event {event_id}")))?;
    Ok(HttpResponse::Ok().json(event))
}

route!(reconcile => Post "/reconcile" impl StockLedger, InventoryPlatform);
/// Runs a full reconciliation sweep now, rather than waiting for the worker.
pub async fn reconcile<B: StockLedger, P: InventoryPlatform>(
    api: web::Data<ReconciliationApi<B, P>>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ Manual reconciliation sweep requested");
    let report = api.run_sweep(SyncSource::Manual).await?;
    Ok(HttpResponse::Ok().json(report))
}
