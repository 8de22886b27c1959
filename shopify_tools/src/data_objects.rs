use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of the `inventory_levels/update` webhook as Shopify delivers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLevelWebhook {
    pub inventory_item_id: u64,
    pub location_id: u64,
    /// Absent or null when the item is not tracked at this location.
    pub available: Option<i64>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub admin_graphql_api_id: Option<String>,
}

//------------------------------------------  GraphQL payloads  ------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryChange {
    pub name: String,
    pub delta: i64,
    #[serde(default)]
    pub quantity_after_change: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAdjustmentGroup {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reference_document_uri: Option<String>,
    pub changes: Vec<InventoryChange>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAdjustQuantitiesPayload {
    pub inventory_adjustment_group: Option<InventoryAdjustmentGroup>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryAdjustQuantitiesResponse {
    pub inventory_adjust_quantities: InventoryAdjustQuantitiesPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InventoryQuantity {
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLevelNode {
    pub id: String,
    pub quantities: Vec<InventoryQuantity>,
}

impl InventoryLevelNode {
    pub fn available(&self) -> Option<i64> {
        self.quantities.iter().find(|q| q.name == "available").map(|q| q.quantity)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemNode {
    pub id: String,
    pub inventory_level: Option<InventoryLevelNode>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemResponse {
    pub inventory_item: Option<InventoryItemNode>,
}

/// The outcome of a successful `available` adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryAdjustment {
    pub inventory_item_id: String,
    pub location_id: String,
    pub delta: i64,
    /// The `available` quantity after the change, if the API version reports it.
    pub quantity_after_change: Option<i64>,
}
