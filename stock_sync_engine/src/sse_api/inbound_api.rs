use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{InboundEvent, NewInboundEvent, SyncContext},
    events::{EventProducers, StockChangedEvent},
    sse_api::{
        errors::SyncApiError,
        sync_objects::{
            InboundNotification,
            InboundOutcome,
            InventoryLevelUpdate,
            ProductSyncOutcome,
            ProductSyncResult,
        },
    },
    traits::{ClaimResult, StockLevelOutcome, StockSyncDatabase},
};

/// `InboundSyncApi` applies verified platform notifications to the local ledger.
///
/// Every notification is claimed in the event journal before any work is done, so a redelivered event (same event
/// id) is never applied twice, even when the deliveries race each other.
pub struct InboundSyncApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for InboundSyncApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InboundSyncApi")
    }
}

impl<B> InboundSyncApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> InboundSyncApi<B>
where B: StockSyncDatabase
{
    /// Claims the event and, if this is its first delivery, applies it.
    ///
    /// Once claimed, the event is always marked processed, with `success = false` if anything went wrong. An error is
    /// only returned when the journal itself fails, or when nothing could be applied at all.
    pub async fn process_event(
        &self,
        event: NewInboundEvent,
        notification: InboundNotification,
    ) -> Result<InboundOutcome, SyncApiError> {
        let event_id = event.event_id.clone();
        let claimed = match self.db.try_claim_event(event).await? {
            ClaimResult::Claimed(claimed) => claimed,
            ClaimResult::Duplicate(existing) => {
                info!("📦️ Event {event_id} is a duplicate. Nothing to do.");
                return Ok(InboundOutcome::Duplicate { event: existing });
            },
        };
        debug!("📦️ Event {event_id} ({}) claimed", claimed.event_type);
        match notification {
            InboundNotification::Unsupported => {
                let msg = format!("unsupported topic: {}", claimed.event_type);
                self.db.mark_event_processed(&event_id, false, Some(msg)).await?;
                info!("📦️ Event {event_id} has topic {} which is not handled. Acknowledged.", claimed.event_type);
                Ok(InboundOutcome::UnsupportedTopic { event_id, event_type: claimed.event_type })
            },
            InboundNotification::Untracked { external_item_ref, external_location_ref } => {
                let msg = format!("item {external_item_ref} is not tracked at location {external_location_ref}");
                self.db.mark_event_processed(&event_id, false, Some(msg)).await?;
                info!("📦️ Event {event_id} carries no level for untracked item {external_item_ref}. Acknowledged.");
                Ok(InboundOutcome::Untracked { event_id, external_item_ref, external_location_ref })
            },
            InboundNotification::InventoryLevel(update) => self.process_inventory_level(&event_id, &update).await,
        }
    }

    async fn process_inventory_level(
        &self,
        event_id: &str,
        update: &InventoryLevelUpdate,
    ) -> Result<InboundOutcome, SyncApiError> {
        let context = SyncContext::inbound(event_id);
        let results = match self.apply_inventory_level(update, &context).await {
            Ok(results) => results,
            Err(e) => {
                error!("📦️ Could not apply event {event_id}. {e}");
                self.db.mark_event_processed(event_id, false, Some(e.to_string())).await?;
                return Err(e);
            },
        };
        if results.is_empty() {
            info!(
                "📦️ Event {event_id}: no products are linked to {} @ {}",
                update.external_item_ref, update.external_location_ref
            );
            self.db.mark_event_processed(event_id, true, None).await?;
            return Ok(InboundOutcome::NoLinkedProducts { event_id: event_id.to_string() });
        }
        let failures = results
            .iter()
            .filter_map(|r| match &r.outcome {
                ProductSyncOutcome::Failed { error } => Some(format!("{}: {error}", r.product_id)),
                _ => None,
            })
            .collect::<Vec<String>>();
        let error = (!failures.is_empty()).then(|| failures.join("; "));
        self.db.mark_event_processed(event_id, failures.is_empty(), error).await?;
        Ok(InboundOutcome::Applied { event_id: event_id.to_string(), results })
    }

    /// Fans an absolute level out to every product linked to the item/location pair. Products with sync disabled are
    /// skipped. A failure on one product is recorded against that product and does not stop the others.
    ///
    /// This does not touch the event journal, so callers are responsible for deduplication.
    pub async fn apply_inventory_level(
        &self,
        update: &InventoryLevelUpdate,
        context: &SyncContext,
    ) -> Result<Vec<ProductSyncResult>, SyncApiError> {
        let linked =
            self.db.fetch_products_linked_to(&update.external_item_ref, &update.external_location_ref).await?;
        let mut results = Vec::with_capacity(linked.len());
        for product in linked {
            let product_id = product.product_id.clone();
            if !product.sync_enabled {
                trace!("📦️ Sync is disabled for {product_id}. Skipping");
                results.push(ProductSyncResult {
                    product_id,
                    outcome: ProductSyncOutcome::Skipped { reason: "sync disabled".into() },
                });
                continue;
            }
            let outcome = match self.db.apply_stock_level(&product_id, update.available, context).await {
                Ok(StockLevelOutcome::Updated(change)) => {
                    info!("📦️ Stock for {product_id} is now {} (was {})", change.inventory.stock, change.previous_stock);
                    self.producers.publish_stock_changed(StockChangedEvent::new(&change)).await;
                    ProductSyncOutcome::Updated {
                        old_stock: change.previous_stock,
                        new_stock: change.inventory.stock,
                    }
                },
                Ok(StockLevelOutcome::SyncDisabled(_)) => {
                    ProductSyncOutcome::Skipped { reason: "sync disabled".into() }
                },
                Ok(StockLevelOutcome::Unchanged(_)) => {
                    ProductSyncOutcome::Skipped { reason: "stock already at this level".into() }
                },
                Err(e) => {
                    let error = e.to_string();
                    warn!("📦️ Could not update the stock for {product_id}. {error}");
                    if let Err(e) = self.db.record_sync_error(&product_id, &error).await {
                        error!("📦️ Could not record the sync error for {product_id}. {e}");
                    }
                    ProductSyncOutcome::Failed { error }
                },
            };
            results.push(ProductSyncResult { product_id, outcome });
        }
        Ok(results)
    }

    pub async fn fetch_event(&self, event_id: &str) -> Result<Option<InboundEvent>, SyncApiError> {
        let event = self.db.fetch_inbound_event(event_id).await?;
        Ok(event)
    }
}
