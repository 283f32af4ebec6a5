//! Repository for the `jobs` table: the relational work queue.

use sqlx::PgPool;
use lexiport_core::types::DbId;

use crate::models::job::{Job, JobPayload, JOB_TYPE_TRANSLATOR_RUN};
use crate::models::status::JobStatus;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, job_type, status_id, org_id, run_id, payload, attempts, last_error, \
    created_at, started_at, finished_at";

/// Provides queue operations for bulk-translation jobs.
pub struct JobRepo;

impl JobRepo {
    /// Enqueue a new job in `queued` status against a run.
    pub async fn submit(
        pool: &PgPool,
        run_id: DbId,
        org_id: Option<DbId>,
        payload: &JobPayload,
    ) -> Result<Job, sqlx::Error> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let query = format!(
            "INSERT INTO jobs (job_type, status_id, org_id, run_id, payload) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JOB_TYPE_TRANSLATOR_RUN)
            .bind(JobStatus::Queued.id())
            .bind(org_id)
            .bind(run_id)
            .bind(payload)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the next claimable job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so a row currently locked by
    /// another claimant is skipped rather than blocked on — the primitive
    /// that lets this generalize to multiple workers without distributed
    /// coordination. Queued rows win over running ones (status order), then
    /// oldest first. The first claim flips `queued -> running` and stamps
    /// `started_at`; later claims of the same running job are no-op status
    /// updates.
    pub async fn claim_next(pool: &PgPool) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs \
             SET status_id = $1, started_at = COALESCE(started_at, NOW()) \
             WHERE id = ( \
                 SELECT id FROM jobs \
                 WHERE status_id IN ($2, $1) \
                 ORDER BY status_id ASC, created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(JobStatus::Running.id())
            .bind(JobStatus::Queued.id())
            .fetch_optional(pool)
            .await
    }

    /// Persist an updated payload (cursor advance) after a successful chunk.
    pub async fn store_payload(
        pool: &PgPool,
        job_id: DbId,
        payload: &JobPayload,
    ) -> Result<(), sqlx::Error> {
        let payload = serde_json::to_value(payload)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        sqlx::query("UPDATE jobs SET payload = $2 WHERE id = $1")
            .bind(job_id)
            .bind(payload)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record a chunk-level failure: bump `attempts`, store the error, leave
    /// the cursor untouched so the same chunk is retried next tick.
    pub async fn record_failure(
        pool: &PgPool,
        job_id: DbId,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
        )
        .bind(job_id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job `done` once its cursor reached the end of the product list.
    pub async fn mark_done(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE jobs SET status_id = $2, finished_at = NOW() WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Done.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark a job `failed` with a reason, unless already terminal.
    ///
    /// Returns `true` if the job was transitioned, `false` if it was already
    /// `done` or `failed`.
    pub async fn fail(pool: &PgPool, job_id: DbId, reason: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs \
             SET status_id = $2, last_error = $3, finished_at = NOW() \
             WHERE id = $1 AND status_id NOT IN ($4, $2)",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.id())
        .bind(reason)
        .bind(JobStatus::Done.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
