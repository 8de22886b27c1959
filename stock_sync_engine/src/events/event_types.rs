use serde::{Deserialize, Serialize};

use crate::db_types::{ProductId, StockUpdate, SyncAction, SyncSource};

/// Emitted after the local ledger adopts a new stock level, whether from an inbound notification or a
/// reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChangedEvent {
    pub product_id: ProductId,
    pub old_stock: i64,
    pub new_stock: i64,
    pub action: SyncAction,
    pub source: SyncSource,
    pub reference_id: Option<String>,
}

impl StockChangedEvent {
    pub fn new(update: &StockUpdate) -> Self {
        Self {
            product_id: update.inventory.product_id.clone(),
            old_stock: update.previous_stock,
            new_stock: update.inventory.stock,
            action: update.log_entry.action,
            source: update.log_entry.source,
            reference_id: update.log_entry.reference_id.clone(),
        }
    }
}

/// Emitted when an outbound adjustment could not be applied on the platform. The platform and the ledger are now
/// known to disagree until the next reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentFailedEvent {
    pub product_id: ProductId,
    pub action: SyncAction,
    pub quantity: i64,
    pub reference_id: Option<String>,
    pub error: String,
}
