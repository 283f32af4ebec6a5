//! Prompt timing telemetry, one row per (run, product, language) attempt.

use serde::Serialize;
use sqlx::FromRow;
use lexiport_core::types::{DbId, LangId, ProductId, Timestamp};

/// A row from the `prompt_metrics` table.
///
/// `prompt_ms` / `finished_at` stay NULL if the process died mid-unit; the
/// start record alone is the crash evidence.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PromptMetric {
    pub id: DbId,
    pub run_id: DbId,
    pub product_id: ProductId,
    pub lang_id: LangId,
    /// Wall-clock time awaiting the main generation call.
    pub prompt_ms: Option<i64>,
    /// Wall-clock time spent on related-entity translation calls.
    pub rel_prompt_ms: Option<i64>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

/// Aggregated averages for `GET /runs/{id}/metrics/avg-by-language`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LanguageAverage {
    pub lang_id: LangId,
    pub avg_prompt_ms: Option<f64>,
    pub avg_rel_prompt_ms: Option<f64>,
    pub samples: i64,
}
