use chrono::Utc;
use log::*;
use sqlx::{types::Json, SqliteConnection};

use crate::{
    db_types::{InboundEvent, NewInboundEvent},
    traits::{ClaimResult, EventJournalError},
};

/// Records the event, relying on the unique constraint on `event_id` to pick exactly one winner among concurrent
/// deliveries of the same event. Losers receive the stored record.
pub async fn claim(event: NewInboundEvent, conn: &mut SqliteConnection) -> Result<ClaimResult, EventJournalError> {
    let event_id = event.event_id.clone();
    let inserted = sqlx::query_as::<_, InboundEvent>(
        r#"
            INSERT INTO inbound_events (event_id, event_type, raw_payload, received_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(event.event_id)
    .bind(event.event_type)
    .bind(Json(event.raw_payload))
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await;
    match inserted {
        Ok(event) => {
            trace!("🗃️ Inbound event {event_id} claimed");
            Ok(ClaimResult::Claimed(event))
        },
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            debug!("🗃️ Inbound event {event_id} has been seen before");
            let existing =
                fetch_event(&event_id, conn).await?.ok_or_else(|| EventJournalError::EventNotFound(event_id))?;
            Ok(ClaimResult::Duplicate(existing))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn mark_processed(
    event_id: &str,
    success: bool,
    error: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<InboundEvent, EventJournalError> {
    let event = sqlx::query_as(
        r#"
            UPDATE inbound_events SET processed = 1, processed_at = $1, success = $2, error_message = $3
            WHERE event_id = $4
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(success)
    .bind(error)
    .bind(event_id)
    .fetch_optional(conn)
    .await?;
    event.ok_or_else(|| EventJournalError::EventNotFound(event_id.to_string()))
}

pub async fn fetch_event(event_id: &str, conn: &mut SqliteConnection) -> Result<Option<InboundEvent>, sqlx::Error> {
    let event = sqlx::query_as("SELECT * FROM inbound_events WHERE event_id = $1")
        .bind(event_id)
        .fetch_optional(conn)
        .await?;
    Ok(event)
}
