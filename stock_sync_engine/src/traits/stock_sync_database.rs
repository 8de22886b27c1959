use crate::traits::{InboundEventJournal, StockLedger};

/// The highest level of behaviour for storage backends supporting the stock sync engine.
#[allow(async_fn_in_trait)]
pub trait StockSyncDatabase: StockLedger + InboundEventJournal {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), crate::traits::StockLedgerError> {
        Ok(())
    }
}
