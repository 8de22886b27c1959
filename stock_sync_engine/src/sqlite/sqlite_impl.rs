//! `SqliteDatabase` is a concrete implementation of a stock sync engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, inbound_events, inventory, new_pool, sync_log};
use crate::{
    db_types::{
        clamp_stock,
        ExternalLink,
        InboundEvent,
        NewInboundEvent,
        NewSyncLogEntry,
        ProductId,
        ProductInventory,
        StockUpdate,
        SyncAction,
        SyncContext,
        SyncLogEntry,
    },
    traits::{
        ClaimResult,
        EventJournalError,
        InboundEventJournal,
        StockLedger,
        StockLedgerError,
        StockLevelOutcome,
        StockSyncDatabase,
    },
};

/// How many times a conditional stock write is retried when another writer got there first.
const MAX_WRITE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the `SSG_DATABASE_URL` environment variable.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Seeds a new, unlinked product. Local stock management is owned by the billing system; this exists for
    /// bootstrapping and tests.
    pub async fn insert_product(
        &self,
        product_id: &ProductId,
        stock: i64,
    ) -> Result<ProductInventory, StockLedgerError> {
        let mut tx = self.pool.begin().await?;
        let product = inventory::insert_product(product_id, stock, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Product {product_id} created with {} units", product.stock);
        Ok(product)
    }
}

/// Writes that return the stored row (`RETURNING`) always run inside an explicit transaction. sqlx hands back the
/// first row before the statement is reset, and only the commit guarantees other pooled connections can see the write.
impl StockLedger for SqliteDatabase {
    async fn fetch_product_inventory(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductInventory>, StockLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let product = inventory::fetch_inventory(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_products_linked_to(
        &self,
        item_ref: &str,
        location_ref: &str,
    ) -> Result<Vec<ProductInventory>, StockLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let products = inventory::fetch_linked_products(item_ref, location_ref, &mut conn).await?;
        Ok(products)
    }

    async fn fetch_sync_enabled_products(&self) -> Result<Vec<ProductInventory>, StockLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let products = inventory::fetch_sync_enabled(&mut conn).await?;
        Ok(products)
    }

    async fn link_product(
        &self,
        product_id: &ProductId,
        link: &ExternalLink,
        sync_enabled: bool,
    ) -> Result<ProductInventory, StockLedgerError> {
        let mut tx = self.pool.begin().await?;
        let product = inventory::upsert_link(product_id, link, sync_enabled, &mut tx).await?;
        tx.commit().await?;
        Ok(product)
    }

    async fn set_sync_enabled(
        &self,
        product_id: &ProductId,
        enabled: bool,
    ) -> Result<ProductInventory, StockLedgerError> {
        let mut tx = self.pool.begin().await?;
        let product = inventory::set_sync_enabled(product_id, enabled, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Sync for product {product_id} is now {}", if enabled { "enabled" } else { "disabled" });
        Ok(product)
    }

    /// The current stock is read outside the write transaction, and the transaction opens with the conditional
    /// `UPDATE`. This way SQLite takes the write lock up front, and a concurrent writer that commits in between makes
    /// the condition fail instead of being overwritten.
    async fn apply_stock_level(
        &self,
        product_id: &ProductId,
        level: i64,
        context: &SyncContext,
    ) -> Result<StockLevelOutcome, StockLedgerError> {
        let (new_stock, clamped) = clamp_stock(level);
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let current = {
                let mut conn = self.pool.acquire().await?;
                inventory::fetch_inventory(product_id, &mut conn)
                    .await?
                    .ok_or_else(|| StockLedgerError::ProductNotFound(product_id.clone()))?
            };
            if !current.sync_enabled {
                debug!("🗃️ Sync is disabled for {product_id}. Stock level {level} is ignored");
                return Ok(StockLevelOutcome::SyncDisabled(current));
            }
            if context.action == SyncAction::Reconcile && current.stock == new_stock {
                debug!("🗃️ Stock for {product_id} is already {new_stock}. Nothing to reconcile");
                return Ok(StockLevelOutcome::Unchanged(current));
            }
            let mut tx = self.pool.begin().await?;
            match inventory::compare_and_set_stock(product_id, current.stock, new_stock, &mut tx).await? {
                Some(updated) => {
                    let change = new_stock - current.stock;
                    let entry = NewSyncLogEntry::new(product_id.clone(), context, change, updated.stock);
                    let log_entry = sync_log::insert_entry(entry, &mut tx).await?;
                    tx.commit().await?;
                    debug!(
                        "🗃️ Stock for {product_id} set {} -> {} ({} via {})",
                        current.stock, updated.stock, context.action, context.source
                    );
                    return Ok(StockLevelOutcome::Updated(StockUpdate {
                        previous_stock: current.stock,
                        inventory: updated,
                        log_entry,
                        clamped,
                    }));
                },
                None => {
                    tx.rollback().await?;
                    debug!("🗃️ Stock for {product_id} changed while writing (attempt {attempt}). Retrying");
                },
            }
        }
        warn!("🗃️ Could not update the stock for {product_id} after {MAX_WRITE_ATTEMPTS} attempts");
        Err(StockLedgerError::ConcurrentModification(product_id.clone(), MAX_WRITE_ATTEMPTS))
    }

    async fn mark_synced(&self, product_id: &ProductId) -> Result<(), StockLedgerError> {
        let mut conn = self.pool.acquire().await?;
        match inventory::mark_synced(product_id, &mut conn).await? {
            0 => Err(StockLedgerError::ProductNotFound(product_id.clone())),
            _ => Ok(()),
        }
    }

    async fn record_sync_error(&self, product_id: &ProductId, error: &str) -> Result<(), StockLedgerError> {
        let mut conn = self.pool.acquire().await?;
        match inventory::set_sync_error(product_id, error, &mut conn).await? {
            0 => Err(StockLedgerError::ProductNotFound(product_id.clone())),
            _ => Ok(()),
        }
    }

    async fn append_sync_log(&self, entry: NewSyncLogEntry) -> Result<SyncLogEntry, StockLedgerError> {
        let mut tx = self.pool.begin().await?;
        let product_id = entry.product_id.clone();
        let entry = sync_log::insert_entry(entry, &mut tx).await.map_err(|e| match e {
            sqlx::Error::Database(err) if err.is_foreign_key_violation() => {
                StockLedgerError::ProductNotFound(product_id)
            },
            _ => StockLedgerError::from(e),
        })?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn fetch_sync_log(&self, product_id: &ProductId, limit: i64) -> Result<Vec<SyncLogEntry>, StockLedgerError> {
        let mut conn = self.pool.acquire().await?;
        let entries = sync_log::fetch_entries(product_id, limit, &mut conn).await?;
        Ok(entries)
    }
}

impl InboundEventJournal for SqliteDatabase {
    async fn try_claim_event(&self, event: NewInboundEvent) -> Result<ClaimResult, EventJournalError> {
        let mut tx = self.pool.begin().await?;
        let result = inbound_events::claim(event, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn mark_event_processed(
        &self,
        event_id: &str,
        success: bool,
        error: Option<String>,
    ) -> Result<InboundEvent, EventJournalError> {
        let mut tx = self.pool.begin().await?;
        let event = inbound_events::mark_processed(event_id, success, error, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Inbound event {event_id} marked processed. Success: {success}");
        Ok(event)
    }

    async fn fetch_inbound_event(&self, event_id: &str) -> Result<Option<InboundEvent>, EventJournalError> {
        let mut conn = self.pool.acquire().await?;
        let event = inbound_events::fetch_event(event_id, &mut conn).await?;
        Ok(event)
    }
}

impl StockSyncDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), StockLedgerError> {
        self.pool.close().await;
        Ok(())
    }
}
