use std::fmt::Debug;

use futures_util::{stream, StreamExt};
use log::*;
use tokio::time::timeout;

use crate::{
    db_types::{clamp_stock, NewSyncLogEntry, SyncContext, SYSTEM_USER},
    events::{AdjustmentFailedEvent, EventProducers},
    sse_api::{
        errors::SyncApiError,
        sync_objects::{
            AdjustmentBatch,
            AdjustmentBatchResult,
            AdjustmentItemResult,
            AdjustmentKind,
            AdjustmentLine,
            SyncOptions,
        },
    },
    traits::{AdjustmentRequest, InventoryPlatform, StockLedger},
};

/// `AdjustmentApi` pushes stock movements caused by local billing to the external platform.
///
/// It never writes the local `stock` column. The platform applies the delta and then reports the new absolute level
/// through the inbound path (or the next reconciliation picks it up).
pub struct AdjustmentApi<B, P> {
    db: B,
    platform: P,
    producers: EventProducers,
    options: SyncOptions,
}

impl<B, P> Debug for AdjustmentApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AdjustmentApi ({:?})", self.options)
    }
}

impl<B, P> AdjustmentApi<B, P> {
    pub fn new(db: B, platform: P, producers: EventProducers, options: SyncOptions) -> Self {
        Self { db, platform, producers, options }
    }
}

impl<B, P> AdjustmentApi<B, P>
where
    B: StockLedger,
    P: InventoryPlatform,
{
    /// Deducts stock on the platform for a finalised invoice.
    pub async fn deduct(&self, batch: AdjustmentBatch) -> AdjustmentBatchResult {
        self.adjust(AdjustmentKind::Deduct, batch).await
    }

    /// Returns stock to the platform for a voided invoice.
    pub async fn restore(&self, batch: AdjustmentBatch) -> AdjustmentBatchResult {
        self.adjust(AdjustmentKind::Restore, batch).await
    }

    /// Runs every line of the batch, with up to `concurrency` platform calls in flight. A failed line never stops the
    /// others. Results are returned in request order.
    pub async fn adjust(&self, kind: AdjustmentKind, batch: AdjustmentBatch) -> AdjustmentBatchResult {
        let concurrency = self.options.concurrency.max(1);
        let results = stream::iter(batch.products.iter())
            .map(|line| self.adjust_item(kind, line, &batch))
            .buffered(concurrency)
            .collect::<Vec<AdjustmentItemResult>>()
            .await;
        let all_succeeded = results.iter().all(|r| r.success);
        let failed = results.iter().filter(|r| !r.success).count();
        let reference = batch.reference_id.as_deref().unwrap_or("(no reference)");
        if all_succeeded {
            info!("🔄️ {kind} for {reference} complete. {} item(s) adjusted", results.len());
        } else {
            warn!("🔄️ {kind} for {reference} complete. {failed} of {} item(s) failed", results.len());
        }
        AdjustmentBatchResult { all_succeeded, results }
    }

    async fn adjust_item(
        &self,
        kind: AdjustmentKind,
        line: &AdjustmentLine,
        batch: &AdjustmentBatch,
    ) -> AdjustmentItemResult {
        let product_id = line.product_id.clone();
        match self.try_adjust_item(kind, line, batch).await {
            Ok(new_quantity) => AdjustmentItemResult::success(product_id, new_quantity),
            Err(e) => {
                let error = e.to_string();
                warn!("🔄️ {kind} of {} x {product_id} failed. {error}", line.quantity);
                if !matches!(e, SyncApiError::ProductNotFound(_)) {
                    if let Err(e) = self.db.record_sync_error(&product_id, &error).await {
                        error!("🔄️ Could not record the sync error for {product_id}. {e}");
                    }
                }
                let event = AdjustmentFailedEvent {
                    product_id: product_id.clone(),
                    action: kind.action(),
                    quantity: line.quantity,
                    reference_id: line.reference_id.clone().or_else(|| batch.reference_id.clone()),
                    error: error.clone(),
                };
                self.producers.publish_adjustment_failed(event).await;
                AdjustmentItemResult::failure(product_id, error)
            },
        }
    }

    async fn try_adjust_item(
        &self,
        kind: AdjustmentKind,
        line: &AdjustmentLine,
        batch: &AdjustmentBatch,
    ) -> Result<Option<i64>, SyncApiError> {
        if line.quantity <= 0 {
            return Err(SyncApiError::InvalidQuantity(line.quantity));
        }
        let product = self
            .db
            .fetch_product_inventory(&line.product_id)
            .await?
            .ok_or_else(|| SyncApiError::ProductNotFound(line.product_id.clone()))?;
        let link = product.external_link().ok_or_else(|| SyncApiError::ProductNotLinked(line.product_id.clone()))?;
        if !product.sync_enabled {
            return Err(SyncApiError::SyncDisabled(line.product_id.clone()));
        }
        let reference_id = line.reference_id.clone().or_else(|| batch.reference_id.clone());
        let request = AdjustmentRequest {
            link,
            delta: kind.delta(line.quantity),
            reason: line.reason.unwrap_or(kind.default_reason()),
            reference_id: reference_id.clone(),
        };
        debug!("🔄️ Requesting {} adjustment of {} for {}", request.reason, request.delta, product.product_id);
        let response = timeout(self.options.platform_timeout, self.platform.adjust_available(&request))
            .await
            .map_err(|_| SyncApiError::PlatformTimeout(self.options.platform_timeout))??;

        let stock_after = response.new_quantity.map(|q| clamp_stock(q).0).unwrap_or(product.stock);
        let context = SyncContext {
            action: kind.action(),
            source: kind.source(),
            reference_id,
            reference_type: batch.reference_type.clone().or_else(|| Some("invoice".to_string())),
            created_by: batch.created_by.clone().unwrap_or_else(|| SYSTEM_USER.to_string()),
        };
        let entry = NewSyncLogEntry::new(product.product_id.clone(), &context, request.delta, stock_after);
        // The platform has already applied the change, so a logging failure must not turn this into a failed item.
        if let Err(e) = self.db.append_sync_log(entry).await {
            error!("🔄️ {kind} for {} was applied but could not be written to the sync log. {e}", product.product_id);
        }
        Ok(response.new_quantity)
    }
}
