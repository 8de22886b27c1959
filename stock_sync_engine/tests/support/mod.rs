#![allow(dead_code)]
use std::time::Duration;

use log::*;
use serde_json::json;
use stock_sync_engine::{
    db_types::{NewInboundEvent, ProductId, ProductInventory, SyncLogEntry},
    events::EventProducers,
    sync_objects::{InboundNotification, InboundOutcome, SyncOptions, INVENTORY_LEVELS_UPDATE},
    test_utils::{
        fake_platform::FakePlatform,
        prepare_env::{drop_database, prepare_test_env, random_db_path, seed_linked_product},
    },
    AdjustmentApi,
    InboundSyncApi,
    InventoryApi,
    ReconciliationApi,
    SqliteDatabase,
    StockLedger,
    StockSyncDatabase,
};

pub struct TestSystem {
    pub db: SqliteDatabase,
    pub platform: FakePlatform,
    pub producers: EventProducers,
}

pub fn fast_options() -> SyncOptions {
    SyncOptions { platform_timeout: Duration::from_millis(250), concurrency: 4 }
}

pub async fn setup() -> TestSystem {
    setup_with_producers(EventProducers::default()).await
}

pub async fn setup_with_producers(producers: EventProducers) -> TestSystem {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    TestSystem { db, platform: FakePlatform::new(), producers }
}

pub async fn tear_down(mut sys: TestSystem) {
    let url = sys.db.url().to_string();
    if let Err(e) = sys.db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    drop_database(&url).await;
}

impl TestSystem {
    pub fn inbound_api(&self) -> InboundSyncApi<SqliteDatabase> {
        InboundSyncApi::new(self.db.clone(), self.producers.clone())
    }

    pub fn adjustment_api(&self) -> AdjustmentApi<SqliteDatabase, FakePlatform> {
        AdjustmentApi::new(self.db.clone(), self.platform.clone(), self.producers.clone(), fast_options())
    }

    pub fn reconcile_api(&self) -> ReconciliationApi<SqliteDatabase, FakePlatform> {
        ReconciliationApi::new(self.db.clone(), self.platform.clone(), self.producers.clone(), fast_options())
    }

    pub fn inventory_api(&self) -> InventoryApi<SqliteDatabase> {
        InventoryApi::new(self.db.clone())
    }

    /// Creates a linked, sync-enabled product, and gives the platform the same level.
    pub async fn linked_product(&self, product_id: &str, stock: i64, item: &str, location: &str) {
        seed_linked_product(&self.db, product_id, stock, item, location).await;
        self.platform.set_level(item, location, stock);
    }

    pub async fn product(&self, product_id: &str) -> ProductInventory {
        self.db
            .fetch_product_inventory(&ProductId::from(product_id))
            .await
            .expect("Error fetching product")
            .expect("Product does not exist")
    }

    pub async fn stock(&self, product_id: &str) -> i64 {
        self.product(product_id).await.stock
    }

    pub async fn log(&self, product_id: &str) -> Vec<SyncLogEntry> {
        self.db.fetch_sync_log(&ProductId::from(product_id), 100).await.expect("Error fetching sync log")
    }

    /// Delivers an inventory level notification, as the platform would.
    pub async fn deliver(&self, event_id: &str, item: &str, location: &str, available: i64) -> InboundOutcome {
        let payload = json!({
            "external_item_ref": item,
            "external_location_ref": location,
            "available": available,
        });
        let event = NewInboundEvent::new(event_id, INVENTORY_LEVELS_UPDATE, payload.clone());
        let update = stock_sync_engine::sync_objects::InventoryLevelUpdate::from_value(&payload).expect("Bad payload");
        self.inbound_api()
            .process_event(event, InboundNotification::InventoryLevel(update))
            .await
            .expect("Error processing event")
    }

    /// Delivers every notification the fake platform has queued since the last call.
    pub async fn deliver_platform_notifications(&self) -> Vec<InboundOutcome> {
        let mut outcomes = vec![];
        for (event_id, update) in self.platform.take_notifications() {
            let event = NewInboundEvent::new(event_id.as_str(), INVENTORY_LEVELS_UPDATE, json!(update));
            let outcome = self
                .inbound_api()
                .process_event(event, InboundNotification::InventoryLevel(update))
                .await
                .expect("Error processing event");
            outcomes.push(outcome);
        }
        outcomes
    }
}
