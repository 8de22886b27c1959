//! Stock Sync Engine
//!
//! The stock sync engine keeps a local stock ledger consistent with an external commerce platform, which holds the
//! authoritative count. This library contains the core logic of the gateway. It is provider-agnostic.
//!
//! The library is divided into three main sections:
//! 1. Interface contracts ([`mod@traits`]). Storage backends implement [`StockLedger`] and [`InboundEventJournal`];
//!    platform integrations implement [`InventoryPlatform`]. A SQLite backend ships with the crate.
//! 2. Data types ([`mod@db_types`]) shared by the backends and the APIs.
//! 3. The public API ([`mod@sse_api`]):
//!    * [`InboundSyncApi`] applies platform notifications to the ledger, at most once per event id.
//!    * [`AdjustmentApi`] pushes billing deductions and restorations to the platform.
//!    * [`ReconciliationApi`] corrects drift between the ledger and the platform.
//!    * [`InventoryApi`] handles links, sync flags, stock checks and the audit trail.
//!
//! The engine also emits events ([`mod@events`]) when the ledger changes or an outbound adjustment fails. A simple
//! hook system lets the host react to them.
pub mod db_types;
pub mod events;
pub mod sse_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use db_types::{ExternalLink, ProductId};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use sse_api::{
    adjustment_api::AdjustmentApi,
    errors::SyncApiError,
    inbound_api::InboundSyncApi,
    inventory_api::InventoryApi,
    reconcile_api::ReconciliationApi,
    sync_objects,
};
pub use traits::{
    ClaimResult,
    EventJournalError,
    InboundEventJournal,
    InventoryPlatform,
    PlatformError,
    StockLedger,
    StockLedgerError,
    StockSyncDatabase,
};
