//! Repository for the `runs` table: the per-request aggregate ledger.

use sqlx::PgPool;
use lexiport_core::types::DbId;

use crate::models::run::{Counters, Run, RunListQuery, RunParams, RunProgress};
use crate::models::status::RunStatus;

/// Column list for `runs` queries.
const COLUMNS: &str = "\
    id, status_id, requested, done, updated, skipped, errors, params, \
    created_at, finished_at";

/// Maximum page size for run listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for run listing.
const DEFAULT_LIMIT: i64 = 50;

/// Provides ledger operations for bulk-translation runs.
pub struct RunRepo;

impl RunRepo {
    /// Create a new run in `running` status. `requested` is the full unit
    /// count of the request: products × target languages.
    pub async fn create(
        pool: &PgPool,
        requested: i64,
        params: &RunParams,
    ) -> Result<Run, sqlx::Error> {
        let params = serde_json::to_value(params)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let query = format!(
            "INSERT INTO runs (status_id, requested, params) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Run>(&query)
            .bind(RunStatus::Running.id())
            .bind(requested)
            .bind(params)
            .fetch_one(pool)
            .await
    }

    /// Find a run by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Run>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM runs WHERE id = $1");
        sqlx::query_as::<_, Run>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List runs, newest first, with optional status filter and pagination.
    pub async fn list(pool: &PgPool, params: &RunListQuery) -> Result<Vec<Run>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
        let offset = params.offset.unwrap_or(0);

        match params.status_id {
            Some(status_id) => {
                let query = format!(
                    "SELECT {COLUMNS} FROM runs WHERE status_id = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3"
                );
                sqlx::query_as::<_, Run>(&query)
                    .bind(status_id)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {COLUMNS} FROM runs \
                     ORDER BY created_at DESC LIMIT $1 OFFSET $2"
                );
                sqlx::query_as::<_, Run>(&query)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(pool)
                    .await
            }
        }
    }

    /// Increment the cumulative totals by a chunk's deltas.
    pub async fn bump_totals(
        pool: &PgPool,
        run_id: DbId,
        delta: &Counters,
    ) -> Result<Run, sqlx::Error> {
        let query = format!(
            "UPDATE runs \
             SET done = done + $2, updated = updated + $3, \
                 skipped = skipped + $4, errors = errors + $5 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Run>(&query)
            .bind(run_id)
            .bind(delta.done)
            .bind(delta.updated)
            .bind(delta.skipped)
            .bind(delta.errors)
            .fetch_one(pool)
            .await
    }

    /// Record the resumability audit trail into `params.progress`.
    pub async fn store_progress(
        pool: &PgPool,
        run_id: DbId,
        progress: &RunProgress,
    ) -> Result<(), sqlx::Error> {
        let progress = serde_json::to_value(progress)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query(
            "UPDATE runs SET params = jsonb_set(params, '{progress}', $2) WHERE id = $1",
        )
        .bind(run_id)
        .bind(progress)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Transition the run to `done`, only if it is still `running`.
    ///
    /// Returns `true` if this call performed the transition — repeated
    /// finalization ticks are no-ops.
    pub async fn mark_done(pool: &PgPool, run_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE runs SET status_id = $2, finished_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(run_id)
        .bind(RunStatus::Done.id())
        .bind(RunStatus::Running.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Transition the run to `failed`, unless it already completed.
    pub async fn mark_failed(pool: &PgPool, run_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE runs SET status_id = $2, finished_at = NOW() \
             WHERE id = $1 AND status_id <> $3",
        )
        .bind(run_id)
        .bind(RunStatus::Failed.id())
        .bind(RunStatus::Done.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
