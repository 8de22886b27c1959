use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------       ProductId       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl FromStr for ProductId {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

impl ProductId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     ExternalLink      ---------------------------------------------------------
/// The coordinates of a product's stock on the external commerce platform. The item and location refs are opaque to
/// the engine; only the platform integration knows how to interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalLink {
    pub item_ref: String,
    #[serde(default)]
    pub variant_ref: Option<String>,
    pub location_ref: String,
}

impl ExternalLink {
    pub fn new<S: Into<String>>(item_ref: S, location_ref: S) -> Self {
        Self { item_ref: item_ref.into(), variant_ref: None, location_ref: location_ref.into() }
    }

    pub fn with_variant<S: Into<String>>(mut self, variant_ref: S) -> Self {
        self.variant_ref = Some(variant_ref.into());
        self
    }
}

impl Display for ExternalLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item {} @ location {}", self.item_ref, self.location_ref)
    }
}

//--------------------------------------   ProductInventory    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ProductInventory {
    pub product_id: ProductId,
    /// Units on hand according to the local ledger. Never negative.
    pub stock: i64,
    pub external_item_ref: Option<String>,
    pub external_variant_ref: Option<String>,
    pub external_location_ref: Option<String>,
    pub sync_enabled: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductInventory {
    /// Returns the external link for this product, if both the item and location refs are set.
    pub fn external_link(&self) -> Option<ExternalLink> {
        match (&self.external_item_ref, &self.external_location_ref) {
            (Some(item), Some(location)) => Some(ExternalLink {
                item_ref: item.clone(),
                variant_ref: self.external_variant_ref.clone(),
                location_ref: location.clone(),
            }),
            _ => None,
        }
    }

    /// A product takes part in synchronisation only when it is enabled *and* linked.
    pub fn is_syncable(&self) -> bool {
        self.sync_enabled && self.external_link().is_some()
    }
}

//--------------------------------------      SyncAction       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    /// The local ledger was overwritten with a value reported by the platform.
    InboundUpdate,
    /// Stock was deducted on the platform because of a local sale.
    Deduct,
    /// Stock was returned to the platform because of a local cancellation or return.
    Restore,
    /// The local ledger was corrected after comparing it with the platform.
    Reconcile,
}

impl Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncAction::InboundUpdate => write!(f, "inbound_update"),
            SyncAction::Deduct => write!(f, "deduct"),
            SyncAction::Restore => write!(f, "restore"),
            SyncAction::Reconcile => write!(f, "reconcile"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

impl FromStr for SyncAction {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound_update" => Ok(Self::InboundUpdate),
            "deduct" => Ok(Self::Deduct),
            "restore" => Ok(Self::Restore),
            "reconcile" => Ok(Self::Reconcile),
            s => Err(ConversionError(format!("Invalid sync action: {s}"))),
        }
    }
}

//--------------------------------------      SyncSource       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    /// A change notification pushed by the platform.
    ExternalWebhook,
    /// An invoice was finalised in local billing.
    InvoiceCreated,
    /// An invoice was voided in local billing.
    InvoiceVoided,
    /// A periodic reconciliation sweep.
    ScheduledReconcile,
    /// An operator-triggered resynchronisation.
    Manual,
}

impl Display for SyncSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncSource::ExternalWebhook => write!(f, "external_webhook"),
            SyncSource::InvoiceCreated => write!(f, "invoice_created"),
            SyncSource::InvoiceVoided => write!(f, "invoice_voided"),
            SyncSource::ScheduledReconcile => write!(f, "scheduled_reconcile"),
            SyncSource::Manual => write!(f, "manual"),
        }
    }
}

impl FromStr for SyncSource {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external_webhook" => Ok(Self::ExternalWebhook),
            "invoice_created" => Ok(Self::InvoiceCreated),
            "invoice_voided" => Ok(Self::InvoiceVoided),
            "scheduled_reconcile" => Ok(Self::ScheduledReconcile),
            "manual" => Ok(Self::Manual),
            s => Err(ConversionError(format!("Invalid sync source: {s}"))),
        }
    }
}

//--------------------------------------     SyncLogEntry      ---------------------------------------------------------
/// One row of the append-only audit trail. Entries are never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: i64,
    pub product_id: ProductId,
    pub action: SyncAction,
    pub source: SyncSource,
    /// Signed change in units. For inbound updates and reconciliations this is `stock_after - stock_before`.
    pub change: i64,
    pub stock_after: i64,
    pub reference_id: Option<String>,
    pub reference_type: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSyncLogEntry {
    pub product_id: ProductId,
    pub action: SyncAction,
    pub source: SyncSource,
    pub change: i64,
    pub stock_after: i64,
    pub reference_id: Option<String>,
    pub reference_type: Option<String>,
    pub created_by: String,
}

impl NewSyncLogEntry {
    pub fn new(product_id: ProductId, context: &SyncContext, change: i64, stock_after: i64) -> Self {
        Self {
            product_id,
            action: context.action,
            source: context.source,
            change,
            stock_after,
            reference_id: context.reference_id.clone(),
            reference_type: context.reference_type.clone(),
            created_by: context.created_by.clone(),
        }
    }
}

//--------------------------------------      SyncContext      ---------------------------------------------------------
/// Describes *why* a ledger change is happening. Every change to the ledger carries one of these so that the audit
/// trail can attribute it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncContext {
    pub action: SyncAction,
    pub source: SyncSource,
    pub reference_id: Option<String>,
    pub reference_type: Option<String>,
    pub created_by: String,
}

pub const SYSTEM_USER: &str = "system";

impl SyncContext {
    pub fn new(action: SyncAction, source: SyncSource) -> Self {
        Self { action, source, reference_id: None, reference_type: None, created_by: SYSTEM_USER.to_string() }
    }

    pub fn inbound(event_id: &str) -> Self {
        Self::new(SyncAction::InboundUpdate, SyncSource::ExternalWebhook).with_reference(event_id, "inbound_event")
    }

    pub fn reconcile(source: SyncSource) -> Self {
        Self::new(SyncAction::Reconcile, source)
    }

    pub fn with_reference<S: Into<String>>(mut self, reference_id: S, reference_type: S) -> Self {
        self.reference_id = Some(reference_id.into());
        self.reference_type = Some(reference_type.into());
        self
    }
}

//--------------------------------------     InboundEvent      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInboundEvent {
    pub event_id: String,
    /// The platform's topic for the notification, e.g. `inventory_levels/update`.
    pub event_type: String,
    pub raw_payload: serde_json::Value,
}

impl NewInboundEvent {
    pub fn new<S: Into<String>>(event_id: S, event_type: S, raw_payload: serde_json::Value) -> Self {
        Self { event_id: event_id.into(), event_type: event_type.into(), raw_payload }
    }
}

/// An inbound notification as recorded in the event journal. `processed` is false while the event is still being
/// applied, and `success` is only meaningful once it is true.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub raw_payload: sqlx::types::Json<serde_json::Value>,
    pub processed: bool,
    pub success: Option<bool>,
    pub error_message: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

//--------------------------------------      StockUpdate      ---------------------------------------------------------
/// The result of a successful ledger write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockUpdate {
    pub previous_stock: i64,
    pub inventory: ProductInventory,
    pub log_entry: SyncLogEntry,
    /// True if the requested level was negative and has been stored as zero.
    pub clamped: bool,
}

/// Negative stock levels are never stored. Returns the level to store, and whether it was clamped.
pub fn clamp_stock(level: i64) -> (i64, bool) {
    if level < 0 {
        warn!("🗃️ Stock level {level} is negative. It will be stored as zero.");
        (0, true)
    } else {
        (level, false)
    }
}
