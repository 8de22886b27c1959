use log::*;
use serde::Deserialize;
use serde_json::Value;
use shopify_tools::{ShopifyApi, ShopifyApiError, ShopifyConfig as ShopifyApiConfig, InventoryLevelWebhook};
use stock_sync_engine::{
    sync_objects::{InboundNotification, InventoryLevelUpdate, INVENTORY_LEVELS_UPDATE},
    traits::{AdjustmentReason, AdjustmentRequest, AdjustmentResponse},
    ExternalLink,
    InventoryPlatform,
    PlatformError,
};

use crate::errors::ServerError;

/// Prefix for the `referenceDocumentUri` that ties a Shopify adjustment back to the invoice that caused it.
pub const INVOICE_DOCUMENT_URI: &str = "gid://ssg/Invoice";

/// The Shopify Admin API as an [`InventoryPlatform`].
#[derive(Clone)]
pub struct ShopifyInventory {
    api: ShopifyApi,
}

impl ShopifyInventory {
    pub fn new(config: ShopifyApiConfig) -> Result<Self, ShopifyApiError> {
        let api = ShopifyApi::new(config)?;
        info!("🛍️️ Shopify inventory client configured for {}", api.shop());
        Ok(Self { api })
    }
}

impl InventoryPlatform for ShopifyInventory {
    async fn adjust_available(&self, request: &AdjustmentRequest) -> Result<AdjustmentResponse, PlatformError> {
        let uri = request.reference_id.as_deref().map(reference_document_uri);
        let result = self
            .api
            .adjust_available(
                &request.link.item_ref,
                &request.link.location_ref,
                request.delta,
                shopify_reason(request.reason),
                uri.as_deref(),
            )
            .await
            .map_err(platform_error)?;
        Ok(AdjustmentResponse { new_quantity: result.quantity_after_change })
    }

    async fn fetch_available(&self, link: &ExternalLink) -> Result<i64, PlatformError> {
        self.api.fetch_available(&link.item_ref, &link.location_ref).await.map_err(platform_error)
    }
}

/// Shopify has no "sale" or "cancellation" adjustment reasons. Sales are recorded as `other`, and returned stock is a
/// `restock`.
pub fn shopify_reason(reason: AdjustmentReason) -> &'static str {
    match reason {
        AdjustmentReason::Sale => "other",
        AdjustmentReason::Cancellation => "restock",
        AdjustmentReason::Restock => "restock",
        AdjustmentReason::Correction => "correction",
        AdjustmentReason::Damaged => "damaged",
        AdjustmentReason::Other => "other",
    }
}

pub fn reference_document_uri(reference_id: &str) -> String {
    format!("{INVOICE_DOCUMENT_URI}/{reference_id}")
}

fn platform_error(e: ShopifyApiError) -> PlatformError {
    match e {
        ShopifyApiError::UserErrors(s) => PlatformError::Rejected(s),
        ShopifyApiError::GraphQLError(s) => PlatformError::Rejected(s),
        ShopifyApiError::NotFound(s) => PlatformError::NotFound(s),
        ShopifyApiError::QueryError { status: 404, message } => PlatformError::NotFound(message),
        ShopifyApiError::QueryError { status, message } if status == 429 || status >= 500 => {
            PlatformError::Unavailable(format!("HTTP {status}. {message}"))
        },
        ShopifyApiError::QueryError { status, message } => PlatformError::Rejected(format!("HTTP {status}. {message}")),
        ShopifyApiError::Initialization(s) | ShopifyApiError::RestRequestError(s) => PlatformError::Unavailable(s),
        e => PlatformError::InvalidResponse(e.to_string()),
    }
}

/// Inventory level bodies arrive either in Shopify's own shape or in the gateway's normalised shape (which is what
/// other producers and replays use).
#[derive(Deserialize)]
#[serde(untagged)]
enum InventoryLevelPayload {
    Normalised(InventoryLevelUpdate),
    Shopify(InventoryLevelWebhook),
}

/// Decodes a verified webhook body according to its topic. Topics other than inventory level updates are not
/// inspected at all.
pub fn decode_notification(topic: &str, body: &Value) -> Result<InboundNotification, ServerError> {
    if topic != INVENTORY_LEVELS_UPDATE {
        return Ok(InboundNotification::Unsupported);
    }
    let payload = InventoryLevelPayload::deserialize(body).map_err(ServerError::bad_inventory_payload)?;
    let update = match payload {
        InventoryLevelPayload::Normalised(update) => update,
        InventoryLevelPayload::Shopify(hook) => match hook.available {
            Some(available) => InventoryLevelUpdate {
                external_item_ref: hook.inventory_item_id.to_string(),
                external_location_ref: hook.location_id.to_string(),
                available,
                updated_at: Some(hook.updated_at),
            },
            None => {
                debug!(
                    "🛍️️ Item {} is not tracked at location {}. There is no level to apply.",
                    hook.inventory_item_id, hook.location_id
                );
                return Ok(InboundNotification::Untracked {
                    external_item_ref: hook.inventory_item_id.to_string(),
                    external_location_ref: hook.location_id.to_string(),
                });
            },
        },
    };
    Ok(InboundNotification::InventoryLevel(update))
}
