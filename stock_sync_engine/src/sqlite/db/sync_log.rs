use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{NewSyncLogEntry, ProductId, SyncLogEntry};

/// Appends an entry to the sync log. Embed this in the same transaction as the stock change it describes.
pub async fn insert_entry(entry: NewSyncLogEntry, conn: &mut SqliteConnection) -> Result<SyncLogEntry, sqlx::Error> {
    let entry = sqlx::query_as(
        r#"
            INSERT INTO sync_log (
                product_id,
                action,
                source,
                change,
                stock_after,
                reference_id,
                reference_type,
                created_by,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(entry.product_id.as_str())
    .bind(entry.action)
    .bind(entry.source)
    .bind(entry.change)
    .bind(entry.stock_after)
    .bind(entry.reference_id)
    .bind(entry.reference_type)
    .bind(entry.created_by)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn fetch_entries(
    product_id: &ProductId,
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<SyncLogEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM sync_log WHERE product_id = $1 ORDER BY id DESC LIMIT $2")
        .bind(product_id.as_str())
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}
