use cucumber::World;
use log::*;
use stock_sync_engine::{
    events::EventProducers,
    sync_objects::{AdjustmentBatchResult, InboundOutcome, SyncOptions},
    test_utils::{
        fake_platform::FakePlatform,
        prepare_env::{create_database, random_db_path, run_migrations},
    },
    AdjustmentApi,
    InboundSyncApi,
    ReconciliationApi,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct StockWorld {
    pub system: Option<StockSyncSystem>,
    pub last_batch: Option<AdjustmentBatchResult>,
    pub last_outcome: Option<InboundOutcome>,
}

#[derive(Debug)]
pub struct StockSyncSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub platform: FakePlatform,
}

impl StockWorld {
    pub fn system(&self) -> &StockSyncSystem {
        self.system.as_ref().expect("Stock sync system not initialised")
    }

    pub fn db(&self) -> &SqliteDatabase {
        &self.system().db
    }

    pub fn platform(&self) -> &FakePlatform {
        &self.system().platform
    }

    pub fn inbound_api(&self) -> InboundSyncApi<SqliteDatabase> {
        InboundSyncApi::new(self.db().clone(), EventProducers::default())
    }

    pub fn adjustment_api(&self) -> AdjustmentApi<SqliteDatabase, FakePlatform> {
        let producers = EventProducers::default();
        AdjustmentApi::new(self.db().clone(), self.platform().clone(), producers, SyncOptions::default())
    }

    pub fn reconcile_api(&self) -> ReconciliationApi<SqliteDatabase, FakePlatform> {
        let producers = EventProducers::default();
        ReconciliationApi::new(self.db().clone(), self.platform().clone(), producers, SyncOptions::default())
    }
}

impl StockSyncSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        Self { db_path: url, db, platform: FakePlatform::new() }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
