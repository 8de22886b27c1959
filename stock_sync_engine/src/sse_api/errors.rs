use std::time::Duration;

use thiserror::Error;

use crate::{
    db_types::ProductId,
    traits::{EventJournalError, PlatformError, StockLedgerError},
};

#[derive(Debug, Clone, Error)]
pub enum SyncApiError {
    #[error("{0}")]
    LedgerError(StockLedgerError),
    #[error("{0}")]
    JournalError(#[from] EventJournalError),
    #[error("{0}")]
    PlatformError(#[from] PlatformError),
    #[error("The platform did not respond within {0:?}")]
    PlatformTimeout(Duration),
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),
    #[error("product {0} is not linked to an external item and location")]
    ProductNotLinked(ProductId),
    #[error("sync is disabled for product {0}")]
    SyncDisabled(ProductId),
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i64),
    #[error("The notification payload is malformed. {0}")]
    MalformedPayload(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
}

impl From<StockLedgerError> for SyncApiError {
    fn from(e: StockLedgerError) -> Self {
        match e {
            StockLedgerError::ProductNotFound(id) => SyncApiError::ProductNotFound(id),
            StockLedgerError::ProductNotLinked(id) => SyncApiError::ProductNotLinked(id),
            e => SyncApiError::LedgerError(e),
        }
    }
}
