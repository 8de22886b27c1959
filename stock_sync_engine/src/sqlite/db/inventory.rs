use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ExternalLink, ProductId, ProductInventory},
    traits::StockLedgerError,
};

pub async fn fetch_inventory(
    product_id: &ProductId,
    conn: &mut SqliteConnection,
) -> Result<Option<ProductInventory>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM product_inventory WHERE product_id = $1")
        .bind(product_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(product)
}

pub async fn fetch_linked_products(
    item_ref: &str,
    location_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<ProductInventory>, sqlx::Error> {
    let products = sqlx::query_as(
        r#"
            SELECT * FROM product_inventory
            WHERE external_item_ref = $1 AND external_location_ref = $2
            ORDER BY product_id;
        "#,
    )
    .bind(item_ref)
    .bind(location_ref)
    .fetch_all(conn)
    .await?;
    Ok(products)
}

pub async fn fetch_sync_enabled(conn: &mut SqliteConnection) -> Result<Vec<ProductInventory>, sqlx::Error> {
    let products = sqlx::query_as(
        r#"
            SELECT * FROM product_inventory
            WHERE sync_enabled = 1 AND external_item_ref IS NOT NULL AND external_location_ref IS NOT NULL
            ORDER BY product_id;
        "#,
    )
    .fetch_all(conn)
    .await?;
    Ok(products)
}

/// Creates the product with zero stock if it is new, otherwise replaces its external link. Existing stock is never
/// touched by a link change.
pub async fn upsert_link(
    product_id: &ProductId,
    link: &ExternalLink,
    sync_enabled: bool,
    conn: &mut SqliteConnection,
) -> Result<ProductInventory, sqlx::Error> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO product_inventory (
                product_id,
                stock,
                external_item_ref,
                external_variant_ref,
                external_location_ref,
                sync_enabled,
                created_at,
                updated_at
            ) VALUES ($1, 0, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (product_id) DO UPDATE SET
                external_item_ref = excluded.external_item_ref,
                external_variant_ref = excluded.external_variant_ref,
                external_location_ref = excluded.external_location_ref,
                sync_enabled = excluded.sync_enabled,
                updated_at = excluded.updated_at
            RETURNING *;
        "#,
    )
    .bind(product_id.as_str())
    .bind(&link.item_ref)
    .bind(&link.variant_ref)
    .bind(&link.location_ref)
    .bind(sync_enabled)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Product {product_id} linked to {link}. Sync enabled: {sync_enabled}");
    Ok(product)
}

pub async fn set_sync_enabled(
    product_id: &ProductId,
    enabled: bool,
    conn: &mut SqliteConnection,
) -> Result<ProductInventory, StockLedgerError> {
    let product = sqlx::query_as(
        "UPDATE product_inventory SET sync_enabled = $1, updated_at = $2 WHERE product_id = $3 RETURNING *",
    )
    .bind(enabled)
    .bind(Utc::now())
    .bind(product_id.as_str())
    .fetch_optional(conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(err) if err.is_check_violation() => {
            StockLedgerError::ProductNotLinked(product_id.clone())
        },
        _ => StockLedgerError::from(e),
    })?;
    product.ok_or_else(|| StockLedgerError::ProductNotFound(product_id.clone()))
}

/// Sets the stock to `new_stock` only if it is still `expected` and sync is still enabled. Returns `None` if the
/// condition no longer holds, in which case nothing was written.
///
/// A successful write also counts as a sync, so `last_synced_at` is stamped and any sync error is cleared.
pub async fn compare_and_set_stock(
    product_id: &ProductId,
    expected: i64,
    new_stock: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<ProductInventory>, sqlx::Error> {
    let now = Utc::now();
    let product = sqlx::query_as(
        r#"
            UPDATE product_inventory
            SET stock = $1, last_synced_at = $2, updated_at = $2, sync_error = NULL
            WHERE product_id = $3 AND stock = $4 AND sync_enabled = 1
            RETURNING *;
        "#,
    )
    .bind(new_stock)
    .bind(now)
    .bind(product_id.as_str())
    .bind(expected)
    .fetch_optional(conn)
    .await?;
    if product.is_none() {
        trace!("🗃️ Conditional stock update for {product_id} did not match (expected {expected})");
    }
    Ok(product)
}

pub async fn mark_synced(product_id: &ProductId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE product_inventory SET last_synced_at = $1, sync_error = NULL, updated_at = $1 WHERE product_id = $2",
    )
    .bind(Utc::now())
    .bind(product_id.as_str())
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn set_sync_error(
    product_id: &ProductId,
    error: &str,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE product_inventory SET sync_error = $1, updated_at = $2 WHERE product_id = $3")
        .bind(error)
        .bind(Utc::now())
        .bind(product_id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Creates a product that is not linked to the platform. Local stock management lives outside this crate, so this is
/// only used to seed products.
pub async fn insert_product(
    product_id: &ProductId,
    stock: i64,
    conn: &mut SqliteConnection,
) -> Result<ProductInventory, sqlx::Error> {
    let now = Utc::now();
    let product = sqlx::query_as(
        r#"
            INSERT INTO product_inventory (product_id, stock, sync_enabled, created_at, updated_at)
            VALUES ($1, $2, 0, $3, $3)
            RETURNING *;
        "#,
    )
    .bind(product_id.as_str())
    .bind(stock.max(0))
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(product)
}
