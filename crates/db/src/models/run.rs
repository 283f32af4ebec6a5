//! Run entity: the per-request aggregate ledger.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use lexiport_core::error::CoreError;
use lexiport_core::types::{DbId, LangId, ProductId, Timestamp};

use super::job::JobPayload;
use super::status::StatusId;

/// A row from the `runs` table. Counters are cumulative and never reset.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Run {
    pub id: DbId,
    pub status_id: StatusId,
    pub requested: i64,
    pub done: i64,
    pub updated: i64,
    pub skipped: i64,
    pub errors: i64,
    pub params: serde_json::Value,
    pub created_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl Run {
    /// Decode the typed params out of the row's JSON document.
    pub fn params(&self) -> Result<RunParams, CoreError> {
        serde_json::from_value(self.params.clone())
            .map_err(|e| CoreError::Internal(format!("Malformed run params: {e}")))
    }
}

/// Per-chunk counter deltas, also used for the run totals bump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub done: i64,
    pub updated: i64,
    pub skipped: i64,
    pub errors: i64,
}

impl Counters {
    pub fn add(&mut self, other: &Counters) {
        self.done += other.done;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.errors += other.errors;
    }
}

/// Resumability audit trail embedded in the run params: the last processed
/// product and the counters of the last completed chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunProgress {
    pub last_product_id: ProductId,
    pub last_chunk: Counters,
}

/// Scope echo stored on the run. Retries at every granularity derive their
/// connection profile, field list, and prompt identity from here — never
/// from caller-supplied values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunParams {
    pub profile_id: DbId,
    pub prefix: String,
    pub id_shop: i64,
    pub id_shop_from: i64,
    pub lang_from_id: LangId,
    pub lang_to_ids: Vec<LangId>,
    /// The full product matrix of the original request, kept for whole-run
    /// retry.
    pub product_ids: Vec<ProductId>,
    pub prompt_id: String,
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
    pub chunk_size: u32,
    #[serde(default)]
    pub progress: Option<RunProgress>,
}

impl RunParams {
    /// Capture a bulk request's scope as the run's stored params.
    pub fn from_request(input: &super::job::CreateJob) -> Self {
        Self {
            profile_id: input.profile_id,
            prefix: input.prefix.clone(),
            id_shop: input.id_shop,
            id_shop_from: input.id_shop_from,
            lang_from_id: input.lang_from_id,
            lang_to_ids: input.lang_to_ids.clone(),
            product_ids: input.product_ids.clone(),
            prompt_id: input.prompt_id.clone(),
            fields: input.fields.clone(),
            include_features: input.include_features,
            include_attributes: input.include_attributes,
            include_attachments: input.include_attachments,
            include_images: input.include_images,
            one_lang_per_prompt: input.one_lang_per_prompt,
            chunk_size: input.chunk_size,
            progress: None,
        }
    }

    /// Build a job payload scoped to the given product/language matrix,
    /// inheriting connection profile, field list, and prompt identity from
    /// these params. Used for the initial job and for every retry
    /// granularity.
    pub fn job_payload(
        &self,
        product_ids: Vec<ProductId>,
        lang_to_ids: Vec<LangId>,
    ) -> JobPayload {
        JobPayload {
            profile_id: self.profile_id,
            prefix: self.prefix.clone(),
            id_shop: self.id_shop,
            id_shop_from: self.id_shop_from,
            lang_from_id: self.lang_from_id,
            lang_to_ids,
            product_ids,
            prompt_id: self.prompt_id.clone(),
            fields: self.fields.clone(),
            include_features: self.include_features,
            include_attributes: self.include_attributes,
            include_attachments: self.include_attachments,
            include_images: self.include_images,
            one_lang_per_prompt: self.one_lang_per_prompt,
            chunk_size: self.chunk_size,
            cursor_index: 0,
        }
    }
}

/// Query parameters for `GET /api/v1/runs`.
#[derive(Debug, Deserialize)]
pub struct RunListQuery {
    pub status_id: Option<StatusId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RunParams {
        RunParams {
            profile_id: 7,
            prefix: "ps_".into(),
            id_shop: 2,
            id_shop_from: 1,
            lang_from_id: 1,
            lang_to_ids: vec![2, 3],
            product_ids: vec![10, 11, 12],
            prompt_id: "catalog-v2".into(),
            fields: vec!["name".into(), "description".into()],
            include_features: true,
            include_attributes: false,
            include_attachments: false,
            include_images: false,
            one_lang_per_prompt: false,
            chunk_size: 25,
            progress: None,
        }
    }

    #[test]
    fn job_payload_inherits_profile_and_fields() {
        let payload = params().job_payload(vec![11], vec![3]);
        assert_eq!(payload.profile_id, 7);
        assert_eq!(payload.prompt_id, "catalog-v2");
        assert_eq!(payload.fields.len(), 2);
        assert_eq!(payload.product_ids, vec![11]);
        assert_eq!(payload.lang_to_ids, vec![3]);
        assert_eq!(payload.cursor_index, 0);
    }

    #[test]
    fn counters_accumulate() {
        let mut totals = Counters::default();
        totals.add(&Counters {
            done: 4,
            updated: 3,
            skipped: 1,
            errors: 0,
        });
        totals.add(&Counters {
            done: 2,
            updated: 2,
            skipped: 0,
            errors: 1,
        });
        assert_eq!(totals.done, 6);
        assert_eq!(totals.updated, 5);
        assert_eq!(totals.skipped, 1);
        assert_eq!(totals.errors, 1);
    }
}
