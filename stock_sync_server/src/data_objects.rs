use serde::{Deserialize, Serialize};
use stock_sync_engine::{
    sync_objects::{InboundOutcome, StockCheckItem, StockCheckResult},
    ExternalLink,
};

/// Webhook acknowledgement. Anything in the 200 range stops Shopify from redelivering.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    pub outcome: InboundOutcome,
}

impl From<InboundOutcome> for WebhookResponse {
    fn from(outcome: InboundOutcome) -> Self {
        Self { success: true, message: outcome.message(), outcome }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCheckRequest {
    pub products: Vec<StockCheckItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockCheckResponse {
    pub items: Vec<StockCheckResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkProductRequest {
    pub external_item_ref: String,
    #[serde(default)]
    pub external_variant_ref: Option<String>,
    pub external_location_ref: String,
    #[serde(default)]
    pub sync_enabled: bool,
}

impl LinkProductRequest {
    pub fn external_link(&self) -> ExternalLink {
        let link = ExternalLink::new(self.external_item_ref.as_str(), self.external_location_ref.as_str());
        match &self.external_variant_ref {
            Some(variant) => link.with_variant(variant.as_str()),
            None => link,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyncToggleRequest {
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SyncLogParams {
    pub limit: Option<i64>,
}
