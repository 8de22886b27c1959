use thiserror::Error;

use crate::db_types::{InboundEvent, NewInboundEvent};

/// The outcome of trying to claim an inbound event id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimResult {
    /// The event id was new. The caller now owns the event and must eventually mark it processed.
    Claimed(InboundEvent),
    /// The event id had already been claimed. The stored record is returned as is, which may still be in flight.
    Duplicate(InboundEvent),
}

/// Behaviour for recording inbound notifications so that each event id is applied at most once.
#[allow(async_fn_in_trait)]
pub trait InboundEventJournal {
    /// Atomically records the event if its id has never been seen before.
    ///
    /// Implementations must guarantee that of any number of concurrent calls with the same `event_id`, exactly one
    /// returns [`ClaimResult::Claimed`]. A check-then-insert that races is not acceptable.
    async fn try_claim_event(&self, event: NewInboundEvent) -> Result<ClaimResult, EventJournalError>;

    /// Sets the processing outcome of a claimed event and stamps `processed_at`.
    async fn mark_event_processed(
        &self,
        event_id: &str,
        success: bool,
        error: Option<String>,
    ) -> Result<InboundEvent, EventJournalError>;

    async fn fetch_inbound_event(&self, event_id: &str) -> Result<Option<InboundEvent>, EventJournalError>;
}

#[derive(Debug, Clone, Error)]
pub enum EventJournalError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The inbound event {0} does not exist")]
    EventNotFound(String),
}

impl From<sqlx::Error> for EventJournalError {
    fn from(e: sqlx::Error) -> Self {
        EventJournalError::DatabaseError(e.to_string())
    }
}
