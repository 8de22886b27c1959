use std::{fmt::Display, sync::Arc};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::ExternalLink;

/// Why stock is being moved on the platform. Platforms map these onto their own reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentReason {
    Sale,
    Cancellation,
    Restock,
    Correction,
    Damaged,
    Other,
}

impl Display for AdjustmentReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdjustmentReason::Sale => "sale",
            AdjustmentReason::Cancellation => "cancellation",
            AdjustmentReason::Restock => "restock",
            AdjustmentReason::Correction => "correction",
            AdjustmentReason::Damaged => "damaged",
            AdjustmentReason::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// A relative change to the platform's quantity for one external item at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentRequest {
    pub link: ExternalLink,
    /// Negative to deduct, positive to restore.
    pub delta: i64,
    pub reason: AdjustmentReason,
    /// Identifies the local document (e.g. an invoice) that caused the adjustment.
    pub reference_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentResponse {
    /// The platform's quantity after the change, if it reported one.
    pub new_quantity: Option<i64>,
}

/// The outbound port to the external commerce platform.
///
/// Callers bound every call with a timeout, so implementations need not impose their own, although they may.
#[allow(async_fn_in_trait)]
pub trait InventoryPlatform {
    async fn adjust_available(&self, request: &AdjustmentRequest) -> Result<AdjustmentResponse, PlatformError>;

    async fn fetch_available(&self, link: &ExternalLink) -> Result<i64, PlatformError>;
}

/// Lets one platform client be shared by several APIs.
impl<P: InventoryPlatform> InventoryPlatform for Arc<P> {
    async fn adjust_available(&self, request: &AdjustmentRequest) -> Result<AdjustmentResponse, PlatformError> {
        self.as_ref().adjust_available(request).await
    }

    async fn fetch_available(&self, link: &ExternalLink) -> Result<i64, PlatformError> {
        self.as_ref().fetch_available(link).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("The platform rejected the request. {0}")]
    Rejected(String),
    #[error("The platform could not be reached. {0}")]
    Unavailable(String),
    #[error("The platform does not know about {0}")]
    NotFound(String),
    #[error("The platform returned an unexpected response. {0}")]
    InvalidResponse(String),
}
