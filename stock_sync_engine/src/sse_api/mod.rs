//! # Stock sync engine public API
//!
//! The `sse_api` module exposes the programmatic API for the stock sync engine. Each API object wraps the backends it
//! needs, so that clients can pick the functionality they want.
//!
//! * [`inbound_api`] applies platform notifications to the ledger, exactly once per event id.
//! * [`adjustment_api`] pushes deductions and restorations from local billing to the platform.
//! * [`reconcile_api`] compares the ledger with the platform and corrects any drift.
//! * [`inventory_api`] covers linking products, toggling sync, stock checks and the audit trail.
//!
//! # API usage
//!
//! ```rust,ignore
//! use stock_sync_engine::{events::EventProducers, InboundSyncApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let api = InboundSyncApi::new(db, EventProducers::default());
//! let outcome = api.process_event(event, notification).await?;
//! ```
pub mod adjustment_api;
pub mod errors;
pub mod inbound_api;
pub mod inventory_api;
pub mod reconcile_api;
pub mod sync_objects;
