use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{ExternalLink, ProductId, ProductInventory, SyncLogEntry},
    sse_api::{
        errors::SyncApiError,
        sync_objects::{StockCheckItem, StockCheckResult},
    },
    traits::StockLedger,
};

pub const DEFAULT_LOG_LIMIT: i64 = 50;
pub const MAX_LOG_LIMIT: i64 = 500;

/// `InventoryApi` covers ledger administration and read-only queries: linking products to the platform, toggling
/// sync, stock availability checks and the audit trail.
pub struct InventoryApi<B> {
    db: B,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> InventoryApi<B>
where B: StockLedger
{
    pub async fn fetch_inventory(&self, product_id: &ProductId) -> Result<ProductInventory, SyncApiError> {
        self.db
            .fetch_product_inventory(product_id)
            .await?
            .ok_or_else(|| SyncApiError::ProductNotFound(product_id.clone()))
    }

    /// Links the product to an external item and location, creating it with zero stock if it is new.
    pub async fn link_product(
        &self,
        product_id: &ProductId,
        link: ExternalLink,
        sync_enabled: bool,
    ) -> Result<ProductInventory, SyncApiError> {
        if product_id.as_str().trim().is_empty() {
            return Err(SyncApiError::InvalidRequest("product id cannot be empty".into()));
        }
        if link.item_ref.trim().is_empty() || link.location_ref.trim().is_empty() {
            return Err(SyncApiError::InvalidRequest(
                "both the external item and location refs are required to link a product".into(),
            ));
        }
        let product = self.db.link_product(product_id, &link, sync_enabled).await?;
        info!("💻️ Product {product_id} linked to {link}. Sync enabled: {sync_enabled}");
        Ok(product)
    }

    pub async fn set_sync_enabled(
        &self,
        product_id: &ProductId,
        enabled: bool,
    ) -> Result<ProductInventory, SyncApiError> {
        let product = self.db.set_sync_enabled(product_id, enabled).await?;
        info!("💻️ Sync for {product_id} {}", if enabled { "enabled" } else { "disabled" });
        Ok(product)
    }

    /// Returns the newest entries first. `limit` defaults to [`DEFAULT_LOG_LIMIT`] and is capped at
    /// [`MAX_LOG_LIMIT`].
    pub async fn sync_log(
        &self,
        product_id: &ProductId,
        limit: Option<i64>,
    ) -> Result<Vec<SyncLogEntry>, SyncApiError> {
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT);
        // Distinguish "no such product" from "no history yet"
        self.fetch_inventory(product_id).await?;
        let entries = self.db.fetch_sync_log(product_id, limit).await?;
        Ok(entries)
    }

    /// Checks each requested quantity against the local ledger. Problems are reported per item; this never fails as
    /// a whole.
    pub async fn check_stock(&self, items: &[StockCheckItem]) -> Vec<StockCheckResult> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(self.check_item(item).await);
        }
        results
    }

    async fn check_item(&self, item: &StockCheckItem) -> StockCheckResult {
        let requested = item.requested_quantity;
        let (available, error) = match self.db.fetch_product_inventory(&item.product_id).await {
            Ok(Some(product)) if requested <= 0 => {
                (product.stock, Some(format!("requested quantity must be positive, got {requested}")))
            },
            Ok(Some(product)) => (product.stock, None),
            Ok(None) => (0, Some("product not found".to_string())),
            Err(e) => {
                warn!("💻️ Could not check stock for {}. {e}", item.product_id);
                (0, Some(e.to_string()))
            },
        };
        let sufficient = error.is_none() && available >= requested;
        StockCheckResult { product_id: item.product_id.clone(), available, requested, sufficient, error }
    }
}
