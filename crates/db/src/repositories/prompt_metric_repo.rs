//! Repository for the `prompt_metrics` table.

use sqlx::PgPool;
use lexiport_core::types::{DbId, LangId, ProductId};

use crate::models::prompt_metric::{LanguageAverage, PromptMetric};

/// Column list for `prompt_metrics` queries.
const COLUMNS: &str = "\
    id, run_id, product_id, lang_id, prompt_ms, rel_prompt_ms, \
    started_at, finished_at";

/// Provides telemetry operations for prompt timing.
pub struct PromptMetricRepo;

impl PromptMetricRepo {
    /// Pre-insert a start record for one (product, language) attempt.
    /// A crash mid-unit still leaves this row behind.
    pub async fn start(
        pool: &PgPool,
        run_id: DbId,
        product_id: ProductId,
        lang_id: LangId,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO prompt_metrics (run_id, product_id, lang_id) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(run_id)
        .bind(product_id)
        .bind(lang_id)
        .fetch_one(pool)
        .await
    }

    /// Complete a start record with the measured durations.
    pub async fn finish(
        pool: &PgPool,
        id: DbId,
        prompt_ms: i64,
        rel_prompt_ms: Option<i64>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE prompt_metrics \
             SET prompt_ms = $2, rel_prompt_ms = $3, finished_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(prompt_ms)
        .bind(rel_prompt_ms)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List a run's metrics in insertion order.
    pub async fn list_by_run(
        pool: &PgPool,
        run_id: DbId,
    ) -> Result<Vec<PromptMetric>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM prompt_metrics WHERE run_id = $1 ORDER BY id ASC"
        );
        sqlx::query_as::<_, PromptMetric>(&query)
            .bind(run_id)
            .fetch_all(pool)
            .await
    }

    /// Average prompt durations per target language for one run. Only
    /// finished attempts contribute.
    pub async fn avg_by_language(
        pool: &PgPool,
        run_id: DbId,
    ) -> Result<Vec<LanguageAverage>, sqlx::Error> {
        sqlx::query_as::<_, LanguageAverage>(
            "SELECT lang_id, \
                    AVG(prompt_ms)::DOUBLE PRECISION AS avg_prompt_ms, \
                    AVG(rel_prompt_ms)::DOUBLE PRECISION AS avg_rel_prompt_ms, \
                    COUNT(*) AS samples \
             FROM prompt_metrics \
             WHERE run_id = $1 AND finished_at IS NOT NULL \
             GROUP BY lang_id \
             ORDER BY lang_id ASC",
        )
        .bind(run_id)
        .fetch_all(pool)
        .await
    }
}
