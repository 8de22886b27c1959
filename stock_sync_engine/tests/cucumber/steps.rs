use std::str::FromStr;

use cucumber::{then, when};
use serde_json::json;
use stock_sync_engine::{
    db_types::{NewInboundEvent, ProductId, SyncAction, SyncSource},
    sync_objects::{
        AdjustmentBatch,
        AdjustmentLine,
        InboundNotification,
        InboundOutcome,
        InventoryLevelUpdate,
        INVENTORY_LEVELS_UPDATE,
    },
    StockLedger,
};

use crate::cucumber::StockWorld;

#[when(expr = "invoice '{word}' deducts {int} units of '{word}'")]
async fn deduct(world: &mut StockWorld, invoice: String, quantity: i64, product_id: String) {
    let batch = AdjustmentBatch::new(vec![AdjustmentLine::new(product_id.as_str(), quantity)]).for_invoice(invoice);
    let result = world.adjustment_api().deduct(batch).await;
    world.last_batch = Some(result);
}

#[when(expr = "invoice '{word}' is voided, restoring {int} units of '{word}'")]
async fn restore(world: &mut StockWorld, invoice: String, quantity: i64, product_id: String) {
    let batch = AdjustmentBatch::new(vec![AdjustmentLine::new(product_id.as_str(), quantity)]).for_invoice(invoice);
    let result = world.adjustment_api().restore(batch).await;
    world.last_batch = Some(result);
}

#[when("the platform notifications are delivered")]
async fn deliver_notifications(world: &mut StockWorld) {
    for (event_id, update) in world.platform().take_notifications() {
        let event = NewInboundEvent::new(event_id.as_str(), INVENTORY_LEVELS_UPDATE, json!(update));
        let outcome = world
            .inbound_api()
            .process_event(event, InboundNotification::InventoryLevel(update))
            .await
            .expect("Error processing event");
        world.last_outcome = Some(outcome);
    }
}

#[when(expr = "event '{word}' reports {int} units of item '{word}' at location '{word}'")]
async fn deliver_event(world: &mut StockWorld, event_id: String, available: i64, item: String, location: String) {
    let update = InventoryLevelUpdate::new(item, location, available);
    let event = NewInboundEvent::new(event_id.as_str(), INVENTORY_LEVELS_UPDATE, json!(update));
    let outcome = world
        .inbound_api()
        .process_event(event, InboundNotification::InventoryLevel(update))
        .await
        .expect("Error processing event");
    world.last_outcome = Some(outcome);
}

#[when(expr = "the platform level of item '{word}' at location '{word}' changes to {int}")]
async fn platform_drift(world: &mut StockWorld, item: String, location: String, available: i64) {
    world.platform().set_level(&item, &location, available);
}

#[when("a reconciliation sweep runs")]
async fn sweep(world: &mut StockWorld) {
    world.reconcile_api().run_sweep(SyncSource::ScheduledReconcile).await.expect("Error running sweep");
}

#[then("the deduction succeeds")]
async fn batch_succeeded(world: &mut StockWorld) {
    let batch = world.last_batch.as_ref().expect("No batch has been run");
    assert!(batch.all_succeeded, "Batch failed: {batch:?}");
}

#[then(expr = "the platform has {int} units of item '{word}' at location '{word}'")]
async fn platform_level(world: &mut StockWorld, available: i64, item: String, location: String) {
    assert_eq!(world.platform().level(&item, &location), Some(available));
}

#[then(expr = "product '{word}' has {int} units")]
async fn product_stock(world: &mut StockWorld, product_id: String, stock: i64) {
    let product = world
        .db()
        .fetch_product_inventory(&ProductId::from(product_id))
        .await
        .expect("Error fetching product")
        .expect("Product does not exist");
    assert_eq!(product.stock, stock);
}

#[then(expr = "product '{word}' has {int} sync log entries")]
async fn log_count(world: &mut StockWorld, product_id: String, count: usize) {
    let log = world.db().fetch_sync_log(&ProductId::from(product_id), 100).await.expect("Error fetching log");
    assert_eq!(log.len(), count);
}

#[then(expr = "the latest sync log entry for '{word}' is {word} with change {int} and stock after {int}")]
async fn latest_log_entry(world: &mut StockWorld, product_id: String, action: String, change: i64, stock_after: i64) {
    let log = world.db().fetch_sync_log(&ProductId::from(product_id), 1).await.expect("Error fetching log");
    let entry = log.first().expect("No sync log entries");
    assert_eq!(entry.action, SyncAction::from_str(&action).expect("Not a sync action"));
    assert_eq!(entry.change, change);
    assert_eq!(entry.stock_after, stock_after);
}

#[then("the last event was a duplicate")]
async fn last_was_duplicate(world: &mut StockWorld) {
    let outcome = world.last_outcome.as_ref().expect("No event has been delivered");
    assert!(matches!(outcome, InboundOutcome::Duplicate { .. }), "Not a duplicate: {outcome:?}");
}
