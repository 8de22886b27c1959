//! # Interface contracts of the stock sync engine.
//!
//! The engine is provider-agnostic at both ends. Storage backends implement the ledger and journal traits, and
//! commerce platform integrations implement [`InventoryPlatform`].
//!
//! * [`StockLedger`] is the authoritative local record of stock per product, together with its append-only audit
//!   trail (the sync log).
//! * [`InboundEventJournal`] records every inbound platform notification and guarantees that each event id is applied
//!   at most once.
//! * [`StockSyncDatabase`] ties the two storage traits together for backends that provide both.
//! * [`InventoryPlatform`] is the outbound port to the external commerce platform.
mod event_journal;
mod inventory_platform;
mod stock_ledger;
mod stock_sync_database;

pub use event_journal::{ClaimResult, EventJournalError, InboundEventJournal};
pub use inventory_platform::{AdjustmentReason, AdjustmentRequest, AdjustmentResponse, InventoryPlatform, PlatformError};
pub use stock_ledger::{StockLedger, StockLedgerError, StockLevelOutcome};
pub use stock_sync_database::StockSyncDatabase;
