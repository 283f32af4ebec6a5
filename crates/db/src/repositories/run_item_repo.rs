//! Repository for the `run_items` table. Append-only.

use sqlx::PgPool;
use lexiport_core::types::{DbId, ProductId};

use crate::models::run_item::RunItem;

/// Column list for `run_items` queries.
const COLUMNS: &str = "id, run_id, product_id, updated, status, message, created_at";

/// Maximum page size for item listing.
const MAX_LIMIT: i64 = 500;

/// Default page size for item listing.
const DEFAULT_LIMIT: i64 = 100;

/// Provides append/list operations for run outcome snapshots.
pub struct RunItemRepo;

impl RunItemRepo {
    /// Append one outcome snapshot. Never updates existing rows; a product
    /// retried later simply appears again.
    pub async fn append(
        pool: &PgPool,
        run_id: DbId,
        product_id: ProductId,
        updated: bool,
        status: &str,
        message: Option<&str>,
    ) -> Result<RunItem, sqlx::Error> {
        let query = format!(
            "INSERT INTO run_items (run_id, product_id, updated, status, message) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RunItem>(&query)
            .bind(run_id)
            .bind(product_id)
            .bind(updated)
            .bind(status)
            .bind(message)
            .fetch_one(pool)
            .await
    }

    /// List a run's items in insertion order.
    pub async fn list_by_run(
        pool: &PgPool,
        run_id: DbId,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<RunItem>, sqlx::Error> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = offset.unwrap_or(0);
        let query = format!(
            "SELECT {COLUMNS} FROM run_items WHERE run_id = $1 \
             ORDER BY id ASC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, RunItem>(&query)
            .bind(run_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
