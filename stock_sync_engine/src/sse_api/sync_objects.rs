use std::{fmt::Display, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    db_types::{InboundEvent, ProductId, SyncAction, SyncSource},
    sse_api::errors::SyncApiError,
    traits::AdjustmentReason,
};

/// The only inbound topic that changes the ledger.
pub const INVENTORY_LEVELS_UPDATE: &str = "inventory_levels/update";

//--------------------------------------    Inbound objects    ---------------------------------------------------------

/// An absolute stock level reported by the platform for one item at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLevelUpdate {
    #[serde(deserialize_with = "string_or_number")]
    pub external_item_ref: String,
    #[serde(deserialize_with = "string_or_number")]
    pub external_location_ref: String,
    pub available: i64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InventoryLevelUpdate {
    pub fn new<S: Into<String>>(item_ref: S, location_ref: S, available: i64) -> Self {
        Self {
            external_item_ref: item_ref.into(),
            external_location_ref: location_ref.into(),
            available,
            updated_at: Some(Utc::now()),
        }
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self, SyncApiError> {
        serde_json::from_value(value.clone()).map_err(|e| SyncApiError::MalformedPayload(e.to_string()))
    }
}

/// Platform refs are opaque strings to the engine, but platforms commonly send them as JSON numbers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ref {
        Str(String),
        Int(i64),
        UInt(u64),
    }
    match Ref::deserialize(deserializer)? {
        Ref::Str(s) => Ok(s),
        Ref::Int(n) => Ok(n.to_string()),
        Ref::UInt(n) => Ok(n.to_string()),
    }
}

/// A verified inbound notification, already decoded according to its topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundNotification {
    InventoryLevel(InventoryLevelUpdate),
    /// An inventory level notification without a quantity, sent when the item is no longer tracked at the location.
    /// There is no level to apply.
    Untracked { external_item_ref: String, external_location_ref: String },
    /// Any topic the engine does not act on. These are journalled but do not change the ledger.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProductSyncOutcome {
    Updated { old_stock: i64, new_stock: i64 },
    Skipped { reason: String },
    Failed { error: String },
}

/// What happened to one linked product when an inbound level was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSyncResult {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub outcome: ProductSyncOutcome,
}

impl ProductSyncResult {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ProductSyncOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InboundOutcome {
    Applied { event_id: String, results: Vec<ProductSyncResult> },
    NoLinkedProducts { event_id: String },
    UnsupportedTopic { event_id: String, event_type: String },
    Untracked { event_id: String, external_item_ref: String, external_location_ref: String },
    /// The event id had been seen before. The stored record carries the original outcome.
    Duplicate { event: InboundEvent },
}

impl InboundOutcome {
    pub fn message(&self) -> String {
        match self {
            InboundOutcome::Applied { event_id, results } => {
                let failed = results.iter().filter(|r| r.is_failure()).count();
                format!("Event {event_id} applied to {} product(s). {failed} failed.", results.len())
            },
            InboundOutcome::NoLinkedProducts { event_id } => {
                format!("Event {event_id} does not match any linked product.")
            },
            InboundOutcome::UnsupportedTopic { event_id, event_type } => {
                format!("Event {event_id} has unsupported topic {event_type}. Ignored.")
            },
            InboundOutcome::Untracked { event_id, external_item_ref, external_location_ref } => {
                format!(
                    "Event {event_id} carries no level. Item {external_item_ref} is not tracked at location \
                     {external_location_ref}."
                )
            },
            InboundOutcome::Duplicate { event } => {
                let status = match (event.processed, event.success) {
                    (false, _) => "is still being processed",
                    (true, Some(true)) => "was processed successfully",
                    (true, _) => "was processed with errors",
                };
                format!("Event {} has already been received and {status}.", event.event_id)
            },
        }
    }
}

//--------------------------------------  Adjustment objects   ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    /// An invoice was finalised. Stock leaves the platform.
    Deduct,
    /// An invoice was voided. Stock goes back to the platform.
    Restore,
}

impl AdjustmentKind {
    pub fn action(&self) -> SyncAction {
        match self {
            AdjustmentKind::Deduct => SyncAction::Deduct,
            AdjustmentKind::Restore => SyncAction::Restore,
        }
    }

    pub fn source(&self) -> SyncSource {
        match self {
            AdjustmentKind::Deduct => SyncSource::InvoiceCreated,
            AdjustmentKind::Restore => SyncSource::InvoiceVoided,
        }
    }

    pub fn default_reason(&self) -> AdjustmentReason {
        match self {
            AdjustmentKind::Deduct => AdjustmentReason::Sale,
            AdjustmentKind::Restore => AdjustmentReason::Cancellation,
        }
    }

    /// Converts a positive quantity into the signed delta sent to the platform.
    pub fn delta(&self, quantity: i64) -> i64 {
        match self {
            AdjustmentKind::Deduct => -quantity,
            AdjustmentKind::Restore => quantity,
        }
    }
}

impl Display for AdjustmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdjustmentKind::Deduct => write!(f, "Deduction"),
            AdjustmentKind::Restore => write!(f, "Restoration"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentLine {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<AdjustmentReason>,
    #[serde(default)]
    pub reference_id: Option<String>,
}

impl AdjustmentLine {
    pub fn new<P: Into<ProductId>>(product_id: P, quantity: i64) -> Self {
        Self { product_id: product_id.into(), quantity, reason: None, reference_id: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentBatch {
    pub products: Vec<AdjustmentLine>,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub reference_type: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl AdjustmentBatch {
    pub fn new(products: Vec<AdjustmentLine>) -> Self {
        Self { products, ..Default::default() }
    }

    pub fn for_invoice<S: Into<String>>(mut self, invoice_id: S) -> Self {
        self.reference_id = Some(invoice_id.into());
        self.reference_type = Some("invoice".into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentItemResult {
    pub product_id: ProductId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdjustmentItemResult {
    pub fn success(product_id: ProductId, new_quantity: Option<i64>) -> Self {
        Self { product_id, success: true, new_quantity, error: None }
    }

    pub fn failure(product_id: ProductId, error: String) -> Self {
        Self { product_id, success: false, new_quantity: None, error: Some(error) }
    }
}

/// Per-item results, in the same order as the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentBatchResult {
    #[serde(rename = "success")]
    pub all_succeeded: bool,
    pub results: Vec<AdjustmentItemResult>,
}

/// Bounds on calls to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Upper bound on a single platform call.
    pub platform_timeout: Duration,
    /// How many platform calls a single batch or sweep may have in flight.
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { platform_timeout: Duration::from_secs(10), concurrency: 4 }
    }
}

//--------------------------------------  Reconcile objects    ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Unchanged { product_id: ProductId, stock: i64 },
    Corrected { product_id: ProductId, old_stock: i64, new_stock: i64 },
    /// Sync was disabled for the product while the sweep was running.
    Skipped { product_id: ProductId },
    Failed { product_id: ProductId, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCorrection {
    pub product_id: ProductId,
    pub old_stock: i64,
    pub new_stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileFailure {
    pub product_id: ProductId,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checked: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub corrected: Vec<StockCorrection>,
    pub failed: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            checked: 0,
            unchanged: 0,
            skipped: 0,
            corrected: vec![],
            failed: vec![],
        }
    }

    pub fn record(&mut self, outcome: ReconcileOutcome) {
        self.checked += 1;
        match outcome {
            ReconcileOutcome::Unchanged { .. } => self.unchanged += 1,
            ReconcileOutcome::Corrected { product_id, old_stock, new_stock } => {
                self.corrected.push(StockCorrection { product_id, old_stock, new_stock })
            },
            ReconcileOutcome::Skipped { .. } => self.skipped += 1,
            ReconcileOutcome::Failed { product_id, error } => self.failed.push(ReconcileFailure { product_id, error }),
        }
    }
}

impl Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} checked, {} corrected, {} unchanged, {} skipped, {} failed",
            self.checked,
            self.corrected.len(),
            self.unchanged,
            self.skipped,
            self.failed.len()
        )
    }
}

//--------------------------------------   Inventory objects   ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCheckItem {
    pub product_id: ProductId,
    pub requested_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCheckResult {
    pub product_id: ProductId,
    pub available: i64,
    pub requested: i64,
    pub sufficient: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
