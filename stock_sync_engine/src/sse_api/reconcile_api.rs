use std::{collections::HashMap, fmt::Debug};

use chrono::Utc;
use futures_util::{stream, StreamExt};
use log::*;
use tokio::time::timeout;

use crate::{
    db_types::{clamp_stock, ExternalLink, ProductId, ProductInventory, SyncContext, SyncSource},
    events::{EventProducers, StockChangedEvent},
    sse_api::{
        errors::SyncApiError,
        sync_objects::{ReconcileOutcome, ReconcileReport, SyncOptions},
    },
    traits::{InventoryPlatform, StockLedger, StockLevelOutcome},
};

type LevelKey = (String, String);

/// `ReconciliationApi` compares the ledger against the platform and overwrites any drift with the platform's value.
///
/// This is the backstop for every missed or reordered notification, so it deliberately does not depend on the event
/// journal at all.
pub struct ReconciliationApi<B, P> {
    db: B,
    platform: P,
    producers: EventProducers,
    options: SyncOptions,
}

impl<B, P> Debug for ReconciliationApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi ({:?})", self.options)
    }
}

impl<B, P> ReconciliationApi<B, P> {
    pub fn new(db: B, platform: P, producers: EventProducers, options: SyncOptions) -> Self {
        Self { db, platform, producers, options }
    }
}

impl<B, P> ReconciliationApi<B, P>
where
    B: StockLedger,
    P: InventoryPlatform,
{
    /// Reconciles every sync-enabled, linked product. Each item/location pair is queried once, however many products
    /// share it. Only a failure to list the products aborts the sweep; everything else is reported per product.
    pub async fn run_sweep(&self, source: SyncSource) -> Result<ReconcileReport, SyncApiError> {
        let mut report = ReconcileReport::new(Utc::now());
        let products = self.db.fetch_sync_enabled_products().await?;
        debug!("🕰️ Reconciling {} product(s)", products.len());
        let mut links = HashMap::<LevelKey, ExternalLink>::new();
        for link in products.iter().filter_map(ProductInventory::external_link) {
            links.entry((link.item_ref.clone(), link.location_ref.clone())).or_insert(link);
        }
        let levels = stream::iter(links)
            .map(|(key, link)| async move {
                let level = self.fetch_level(&link).await.map_err(|e| e.to_string());
                (key, level)
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect::<HashMap<LevelKey, Result<i64, String>>>()
            .await;
        let context = SyncContext::reconcile(source);
        for product in products {
            let level = match (&product.external_item_ref, &product.external_location_ref) {
                (Some(item), Some(location)) => levels
                    .get(&(item.clone(), location.clone()))
                    .cloned()
                    .unwrap_or_else(|| Err("no platform level was fetched".to_string())),
                _ => Err("product is not linked".to_string()),
            };
            let outcome = self.reconcile_product(&product, level, &context).await;
            report.record(outcome);
        }
        report.finished_at = Utc::now();
        if report.failed.is_empty() {
            info!("🕰️ Reconciliation sweep complete. {report}");
        } else {
            warn!("🕰️ Reconciliation sweep complete with failures. {report}");
        }
        Ok(report)
    }

    /// Reconciles a single product on operator request. Unlike the sweep, problems with the product itself are
    /// returned as errors.
    pub async fn resync_product(&self, product_id: &ProductId) -> Result<ReconcileOutcome, SyncApiError> {
        let product = self
            .db
            .fetch_product_inventory(product_id)
            .await?
            .ok_or_else(|| SyncApiError::ProductNotFound(product_id.clone()))?;
        let link = product.external_link().ok_or_else(|| SyncApiError::ProductNotLinked(product_id.clone()))?;
        if !product.sync_enabled {
            return Err(SyncApiError::SyncDisabled(product_id.clone()));
        }
        let level = self.fetch_level(&link).await.map_err(|e| e.to_string());
        let context = SyncContext::reconcile(SyncSource::Manual);
        Ok(self.reconcile_product(&product, level, &context).await)
    }

    async fn fetch_level(&self, link: &ExternalLink) -> Result<i64, SyncApiError> {
        let level = timeout(self.options.platform_timeout, self.platform.fetch_available(link))
            .await
            .map_err(|_| SyncApiError::PlatformTimeout(self.options.platform_timeout))??;
        trace!("🕰️ Platform reports {level} available for {link}");
        Ok(level)
    }

    async fn reconcile_product(
        &self,
        product: &ProductInventory,
        level: Result<i64, String>,
        context: &SyncContext,
    ) -> ReconcileOutcome {
        let product_id = product.product_id.clone();
        let level = match level {
            Ok(level) => level,
            Err(error) => return self.fail(product_id, error).await,
        };
        if clamp_stock(level).0 == product.stock {
            return match self.db.mark_synced(&product_id).await {
                Ok(()) => ReconcileOutcome::Unchanged { product_id, stock: product.stock },
                Err(e) => self.fail(product_id, e.to_string()).await,
            };
        }
        match self.db.apply_stock_level(&product_id, level, context).await {
            Ok(StockLevelOutcome::Updated(change)) => {
                info!(
                    "🕰️ Stock for {product_id} corrected from {} to {}",
                    change.previous_stock, change.inventory.stock
                );
                self.producers.publish_stock_changed(StockChangedEvent::new(&change)).await;
                ReconcileOutcome::Corrected {
                    product_id,
                    old_stock: change.previous_stock,
                    new_stock: change.inventory.stock,
                }
            },
            Ok(StockLevelOutcome::SyncDisabled(_)) => ReconcileOutcome::Skipped { product_id },
            // The ledger caught up with the platform after the snapshot was taken
            Ok(StockLevelOutcome::Unchanged(current)) => match self.db.mark_synced(&product_id).await {
                Ok(()) => ReconcileOutcome::Unchanged { product_id, stock: current.stock },
                Err(e) => self.fail(product_id, e.to_string()).await,
            },
            Err(e) => self.fail(product_id, e.to_string()).await,
        }
    }

    async fn fail(&self, product_id: ProductId, error: String) -> ReconcileOutcome {
        warn!("🕰️ Could not reconcile {product_id}. {error}");
        if let Err(e) = self.db.record_sync_error(&product_id, &error).await {
            error!("🕰️ Could not record the sync error for {product_id}. {e}");
        }
        ReconcileOutcome::Failed { product_id, error }
    }
}
