use thiserror::Error;

use crate::db_types::{
    ExternalLink,
    NewSyncLogEntry,
    ProductId,
    ProductInventory,
    StockUpdate,
    SyncContext,
    SyncLogEntry,
};

/// The result of asking the ledger to adopt a new stock level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockLevelOutcome {
    Updated(StockUpdate),
    /// Sync was disabled for the product by the time the write was attempted. Nothing was changed or logged.
    SyncDisabled(ProductInventory),
    /// A reconciling write found the ledger already at the target level. Nothing was changed or logged.
    Unchanged(ProductInventory),
}

/// The local stock ledger.
///
/// Every method that changes the `stock` column also appends exactly one sync log entry, in the same atomic unit as
/// the stock change. The stock value is never negative.
#[allow(async_fn_in_trait)]
pub trait StockLedger {
    async fn fetch_product_inventory(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductInventory>, StockLedgerError>;

    /// Returns every product linked to the given external item at the given location, whether or not sync is
    /// enabled for it. Several local products may share one external item.
    async fn fetch_products_linked_to(
        &self,
        item_ref: &str,
        location_ref: &str,
    ) -> Result<Vec<ProductInventory>, StockLedgerError>;

    /// Returns every product that is both sync-enabled and linked.
    async fn fetch_sync_enabled_products(&self) -> Result<Vec<ProductInventory>, StockLedgerError>;

    /// Creates the product if it does not exist (with zero stock), and sets its external link and sync flag.
    async fn link_product(
        &self,
        product_id: &ProductId,
        link: &ExternalLink,
        sync_enabled: bool,
    ) -> Result<ProductInventory, StockLedgerError>;

    /// Enabling sync on a product without an external link fails with [`StockLedgerError::ProductNotLinked`].
    async fn set_sync_enabled(
        &self,
        product_id: &ProductId,
        enabled: bool,
    ) -> Result<ProductInventory, StockLedgerError>;

    /// Overwrites the stock of a sync-enabled product with `level` (clamped at zero) and appends a log entry described
    /// by `context`, atomically.
    ///
    /// The write is conditional on the stock not having changed since it was read, and is retried a bounded number of
    /// times, so that concurrent writers never lose each other's updates silently.
    ///
    /// Reconciling writes ([`SyncAction::Reconcile`](crate::db_types::SyncAction::Reconcile)) compare against the stock as it is at write time, and return
    /// [`StockLevelOutcome::Unchanged`] instead of logging a zero change. Every other action is always logged.
    async fn apply_stock_level(
        &self,
        product_id: &ProductId,
        level: i64,
        context: &SyncContext,
    ) -> Result<StockLevelOutcome, StockLedgerError>;

    /// Stamps `last_synced_at` and clears any recorded sync error.
    async fn mark_synced(&self, product_id: &ProductId) -> Result<(), StockLedgerError>;

    async fn record_sync_error(&self, product_id: &ProductId, error: &str) -> Result<(), StockLedgerError>;

    /// Appends an audit entry without touching the stock column. Used for outbound adjustments, which change the
    /// platform's quantity rather than the ledger's.
    async fn append_sync_log(&self, entry: NewSyncLogEntry) -> Result<SyncLogEntry, StockLedgerError>;

    /// Returns the most recent `limit` entries for the product, newest first.
    async fn fetch_sync_log(&self, product_id: &ProductId, limit: i64) -> Result<Vec<SyncLogEntry>, StockLedgerError>;
}

#[derive(Debug, Clone, Error)]
pub enum StockLedgerError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Product {0} has no external link, so it cannot be synchronised")]
    ProductNotLinked(ProductId),
    #[error("The stock of product {0} kept changing underneath us. Gave up after {1} attempts")]
    ConcurrentModification(ProductId, usize),
}

impl From<sqlx::Error> for StockLedgerError {
    fn from(e: sqlx::Error) -> Self {
        StockLedgerError::DatabaseError(e.to_string())
    }
}
