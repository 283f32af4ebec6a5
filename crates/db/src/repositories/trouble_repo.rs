//! Repository for the `troubles` table: the retry ledger.

use sqlx::PgPool;
use lexiport_core::outcome::TroubleCode;
use lexiport_core::types::{DbId, LangId, ProductId};

use crate::models::status::{StatusId, TroubleStatus};
use crate::models::trouble::{Trouble, TroubleListQuery};

/// Column list for `troubles` queries.
const COLUMNS: &str = "\
    id, run_id, product_id, lang_id, code, message, status_id, attempts, \
    created_at, updated_at";

/// Maximum page size for trouble listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for trouble listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides operations on the per-unit failure ledger.
pub struct TroubleRepo;

impl TroubleRepo {
    /// Record a unit failure in `open` status.
    pub async fn record(
        pool: &PgPool,
        run_id: DbId,
        product_id: ProductId,
        lang_id: LangId,
        code: TroubleCode,
        message: &str,
    ) -> Result<Trouble, sqlx::Error> {
        let query = format!(
            "INSERT INTO troubles (run_id, product_id, lang_id, code, message, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Trouble>(&query)
            .bind(run_id)
            .bind(product_id)
            .bind(lang_id)
            .bind(code.as_str())
            .bind(message)
            .bind(TroubleStatus::Open.id())
            .fetch_one(pool)
            .await
    }

    /// Find a trouble by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Trouble>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM troubles WHERE id = $1");
        sqlx::query_as::<_, Trouble>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List troubles with optional status/run filters, newest first.
    pub async fn list(
        pool: &PgPool,
        status_id: Option<StatusId>,
        params: &TroubleListQuery,
    ) -> Result<Vec<Trouble>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if status_id.is_some() {
            conditions.push(format!("status_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if params.run_id.is_some() {
            conditions.push(format!("run_id = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM troubles \
             {where_clause} \
             ORDER BY created_at DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, Trouble>(&query);
        if let Some(sid) = status_id {
            q = q.bind(sid);
        }
        if let Some(rid) = params.run_id {
            q = q.bind(rid);
        }
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Distinct product ids with open troubles for a run, in id order.
    /// Drives `mode: "failed"` whole-run retries.
    pub async fn open_products(
        pool: &PgPool,
        run_id: DbId,
    ) -> Result<Vec<ProductId>, sqlx::Error> {
        sqlx::query_scalar::<_, ProductId>(
            "SELECT DISTINCT product_id FROM troubles \
             WHERE run_id = $1 AND status_id = $2 \
             ORDER BY product_id ASC",
        )
        .bind(run_id)
        .bind(TroubleStatus::Open.id())
        .fetch_all(pool)
        .await
    }

    /// Transition one trouble to `queued` when a retry job is created from
    /// it, bumping its attempt counter.
    pub async fn mark_queued(pool: &PgPool, id: DbId) -> Result<Trouble, sqlx::Error> {
        let query = format!(
            "UPDATE troubles \
             SET status_id = $2, attempts = attempts + 1, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Trouble>(&query)
            .bind(id)
            .bind(TroubleStatus::Queued.id())
            .fetch_one(pool)
            .await
    }

    /// Transition all of a run's open troubles to `queued` (whole-run
    /// retry). Returns the number of rows transitioned.
    pub async fn queue_open_for_run(pool: &PgPool, run_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE troubles \
             SET status_id = $2, attempts = attempts + 1, updated_at = NOW() \
             WHERE run_id = $1 AND status_id = $3",
        )
        .bind(run_id)
        .bind(TroubleStatus::Queued.id())
        .bind(TroubleStatus::Open.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Mark a trouble `resolved`. Returns `false` if it already was.
    pub async fn resolve(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE troubles SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 AND status_id <> $2",
        )
        .bind(id)
        .bind(TroubleStatus::Resolved.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
