//! Job entity and payload for the bulk-translation queue.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use lexiport_core::error::CoreError;
use lexiport_core::types::{DbId, LangId, ProductId, Timestamp};

use super::status::StatusId;

/// Work-kind tag for bulk translation runs. The queue schema supports other
/// kinds, but this pipeline only ever enqueues this one.
pub const JOB_TYPE_TRANSLATOR_RUN: &str = "translator_run";

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub job_type: String,
    pub status_id: StatusId,
    pub org_id: Option<DbId>,
    pub run_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub finished_at: Option<Timestamp>,
}

impl Job {
    /// Decode the typed payload out of the row's JSON document.
    pub fn payload(&self) -> Result<JobPayload, CoreError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| CoreError::Internal(format!("Malformed job payload: {e}")))
    }
}

/// Immutable run parameters plus the mutable chunk cursor, stored as the
/// job's `payload` JSONB document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobPayload {
    /// Catalog connection profile (resolved server-side, never caller data).
    pub profile_id: DbId,
    /// Catalog table-name prefix. Validated against an allow-list before
    /// any statement interpolation.
    pub prefix: String,
    /// Destination shop scope.
    pub id_shop: i64,
    /// Source shop for reading source-language text.
    pub id_shop_from: i64,
    pub lang_from_id: LangId,
    pub lang_to_ids: Vec<LangId>,
    /// Full ordered product list for this job.
    pub product_ids: Vec<ProductId>,
    /// Prompt identity at the text-generation endpoint.
    pub prompt_id: String,
    /// Requested output fields.
    pub fields: Vec<String>,
    #[serde(default)]
    pub include_features: bool,
    #[serde(default)]
    pub include_attributes: bool,
    #[serde(default)]
    pub include_attachments: bool,
    #[serde(default)]
    pub include_images: bool,
    /// One generation call per target language. Forced by the executor
    /// whenever more than one target language is requested.
    #[serde(default)]
    pub one_lang_per_prompt: bool,
    pub chunk_size: u32,
    /// Progress through `product_ids`. Monotonically non-decreasing;
    /// advanced only after a chunk fully succeeds.
    #[serde(default)]
    pub cursor_index: usize,
}

impl JobPayload {
    /// The next chunk of products to process, bounded by `chunk_size`.
    /// Empty exactly when the cursor has reached the end of the list.
    pub fn next_slice(&self) -> &[ProductId] {
        let start = self.cursor_index.min(self.product_ids.len());
        let end = start
            .saturating_add(self.chunk_size.max(1) as usize)
            .min(self.product_ids.len());
        &self.product_ids[start..end]
    }

    /// Whether every product has been processed.
    pub fn is_complete(&self) -> bool {
        self.cursor_index >= self.product_ids.len()
    }

    /// Advance the cursor past a successfully processed slice.
    pub fn advance(&mut self, processed: usize) {
        self.cursor_index = self
            .cursor_index
            .saturating_add(processed)
            .min(self.product_ids.len());
    }
}

/// DTO for `POST /api/v1/jobs`: one bulk translation request.
#[derive(Debug, Clone, Deserialize, validator::Validate)]
pub struct CreateJob {
    pub profile_id: DbId,
    #[validate(length(min = 1, max = 64))]
    pub prefix: String,
    pub id_shop: i64,
    pub id_shop_from: i64,
    pub lang_from_id: LangId,
    #[validate(length(min = 1))]
    pub lang_to_ids: Vec<LangId>,
    #[validate(length(min = 1))]
    pub product_ids: Vec<ProductId>,
    #[validate(length(min = 1))]
    pub prompt_id: String,
    #[validate(length(min = 1))]
    pub fields: Vec<String>,
    #[serde(default)]
    pub include_features: bool,
    #[serde(default)]
    pub include_attributes: bool,
    #[serde(default)]
    pub include_attachments: bool,
    #[serde(default)]
    pub include_images: bool,
    #[serde(default)]
    pub one_lang_per_prompt: bool,
    #[validate(range(min = 1, max = 500))]
    pub chunk_size: u32,
    pub org_id: Option<DbId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(products: Vec<ProductId>, chunk_size: u32, cursor: usize) -> JobPayload {
        JobPayload {
            profile_id: 1,
            prefix: "ps_".into(),
            id_shop: 1,
            id_shop_from: 1,
            lang_from_id: 1,
            lang_to_ids: vec![2, 3],
            product_ids: products,
            prompt_id: "default".into(),
            fields: vec!["name".into()],
            include_features: false,
            include_attributes: false,
            include_attachments: false,
            include_images: false,
            one_lang_per_prompt: false,
            chunk_size,
            cursor_index: cursor,
        }
    }

    #[test]
    fn next_slice_is_bounded_by_chunk_size() {
        let p = payload(vec![10, 11, 12], 2, 0);
        assert_eq!(p.next_slice(), &[10, 11]);
    }

    #[test]
    fn next_slice_clamps_at_list_end() {
        let p = payload(vec![10, 11, 12], 2, 2);
        assert_eq!(p.next_slice(), &[12]);
    }

    #[test]
    fn exhausted_cursor_yields_empty_slice() {
        let p = payload(vec![10, 11, 12], 2, 3);
        assert!(p.next_slice().is_empty());
        assert!(p.is_complete());
    }

    #[test]
    fn advance_never_overshoots() {
        let mut p = payload(vec![10, 11, 12], 2, 2);
        p.advance(5);
        assert_eq!(p.cursor_index, 3);
    }

    #[test]
    fn cursor_survives_serde_round_trip() {
        let mut p = payload(vec![10, 11], 2, 0);
        p.advance(2);
        let value = serde_json::to_value(&p).unwrap();
        let back: JobPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back.cursor_index, 2);
    }

    #[test]
    fn cursor_defaults_to_zero_when_absent() {
        let value = serde_json::json!({
            "profile_id": 1, "prefix": "ps_", "id_shop": 1, "id_shop_from": 1,
            "lang_from_id": 1, "lang_to_ids": [2], "product_ids": [10],
            "prompt_id": "default", "fields": ["name"], "chunk_size": 25
        });
        let p: JobPayload = serde_json::from_value(value).unwrap();
        assert_eq!(p.cursor_index, 0);
    }
}
