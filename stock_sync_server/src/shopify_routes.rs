//! Shopify webhook handlers. These sit behind the HMAC middleware, so by the time a handler runs the body is known to
//! be authentic and the topic and webhook id headers are present.

use actix_web::{web, HttpRequest, HttpResponse};
use log::*;
use serde_json::Value;
use stock_sync_engine::{db_types::NewInboundEvent, InboundSyncApi, StockSyncDatabase};

use crate::{
    data_objects::WebhookResponse,
    errors::{ServerError, WebhookAuthError},
    integrations::shopify::decode_notification,
    route,
};

pub const SHOPIFY_TOPIC_HEADER: &str = "X-Shopify-Topic";
pub const SHOPIFY_WEBHOOK_ID_HEADER: &str = "X-Shopify-Webhook-Id";
pub const SHOPIFY_HMAC_HEADER: &str = "X-Shopify-Hmac-Sha256";

//----------------------------------------------   Inventory  ----------------------------------------------------
route!(inventory_webhook => Post "/webhook/inventory" impl StockSyncDatabase);
/// Receives inventory notifications from Shopify.
///
/// Every authentic, well-formed notification is acknowledged with a 200, including duplicates and topics that are not
/// acted on, otherwise Shopify keeps retrying. A 500 means the journal or the ledger could not be written. If the
/// event had already been claimed it is marked processed with `success = false`, and Shopify's redelivery is answered
/// as a duplicate carrying that record. The ledger is then brought back in line by the next reconciliation sweep.
pub async fn inventory_webhook<B: StockSyncDatabase>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<InboundSyncApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let topic = header_value(&req, SHOPIFY_TOPIC_HEADER)?;
    let event_id = header_value(&req, SHOPIFY_WEBHOOK_ID_HEADER)?;
    trace!("🛍️️ Received webhook {event_id} ({topic})");
    let payload = serde_json::from_slice::<Value>(&body).map_err(|e| {
        warn!("🛍️️ Webhook {event_id} body is not valid JSON. {e}");
        ServerError::MalformedPayload(e.to_string())
    })?;
    let notification = decode_notification(&topic, &payload).map_err(|e| {
        warn!("🛍️️ Webhook {event_id} could not be decoded. {e}");
        e
    })?;
    let event = NewInboundEvent::new(event_id, topic, payload);
    let outcome = api.process_event(event, notification).await?;
    debug!("🛍️️ {}", outcome.message());
    Ok(HttpResponse::Ok().json(WebhookResponse::from(outcome)))
}

fn header_value(req: &HttpRequest, name: &'static str) -> Result<String, ServerError> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServerError::from(WebhookAuthError::MissingHeader(name)))
}
