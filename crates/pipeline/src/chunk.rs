//! Chunk request/response shapes and the pure slicing decisions.

use serde::{Deserialize, Serialize};

use lexiport_core::outcome::UnitOutcome;
use lexiport_core::types::{DbId, LangId, ProductId};
use lexiport_db::models::job::JobPayload;
use lexiport_db::models::run::Counters;

/// One bounded batch of work for the chunk executor: a pre-sliced product
/// list plus the run's immutable parameters. Built either from a claimed
/// job's payload (worker path) or from a manual chunk request (API path).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRequest {
    pub run_id: DbId,
    pub profile_id: DbId,
    pub prefix: String,
    pub id_shop: i64,
    pub id_shop_from: i64,
    pub lang_from_id: LangId,
    pub lang_to_ids: Vec<LangId>,
    /// Products for this chunk only, already sliced by the caller.
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
    /// Generation runs, writes are skipped, outcomes report `preview`.
    #[serde(default)]
    pub dry_run: bool,
}

impl ChunkRequest {
    /// Build the worker-path request from a claimed job's payload and its
    /// next product slice.
    pub fn from_payload(run_id: DbId, payload: &JobPayload, products: &[ProductId]) -> Self {
        Self {
            run_id,
            profile_id: payload.profile_id,
            prefix: payload.prefix.clone(),
            id_shop: payload.id_shop,
            id_shop_from: payload.id_shop_from,
            lang_from_id: payload.lang_from_id,
            lang_to_ids: payload.lang_to_ids.clone(),
            product_ids: products.to_vec(),
            prompt_id: payload.prompt_id.clone(),
            fields: payload.fields.clone(),
            include_features: payload.include_features,
            include_attributes: payload.include_attributes,
            include_attachments: payload.include_attachments,
            include_images: payload.include_images,
            one_lang_per_prompt: payload.one_lang_per_prompt,
            dry_run: false,
        }
    }

    /// Target-language batches for one product's generation calls.
    ///
    /// Sequential one-call-per-language mode is forced whenever more than
    /// one target language is requested, to bound prompt complexity and
    /// isolate failures per language. A single multi-language call is
    /// therefore only possible for a single-language request.
    pub fn lang_batches(&self) -> Vec<Vec<LangId>> {
        if self.one_lang_per_prompt || self.lang_to_ids.len() > 1 {
            self.lang_to_ids.iter().map(|&lang| vec![lang]).collect()
        } else {
            vec![self.lang_to_ids.clone()]
        }
    }
}

/// Per-unit result in a chunk response. `lang_id` is absent for
/// product-scoped skips, which happen before any language is attempted.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub product_id: ProductId,
    pub lang_id: Option<LangId>,
    #[serde(flatten)]
    pub outcome: UnitOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UnitReport {
    pub fn new(product_id: ProductId, lang_id: Option<LangId>, outcome: UnitOutcome) -> Self {
        Self {
            product_id,
            lang_id,
            outcome,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// The chunk executor's response: every unit's outcome plus the aggregate
/// deltas already applied to the run totals.
#[derive(Debug, Serialize)]
pub struct ChunkOutcome {
    pub items: Vec<UnitReport>,
    pub stats: Counters,
    pub dry_run: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexiport_core::outcome::TroubleCode;

    fn request(lang_to_ids: Vec<LangId>, one_lang_per_prompt: bool) -> ChunkRequest {
        ChunkRequest {
            run_id: 1,
            profile_id: 1,
            prefix: "ps_".into(),
            id_shop: 1,
            id_shop_from: 1,
            lang_from_id: 1,
            lang_to_ids,
            product_ids: vec![10, 11],
            prompt_id: "default".into(),
            fields: vec!["name".into()],
            include_features: false,
            include_attributes: false,
            include_attachments: false,
            include_images: false,
            one_lang_per_prompt,
            dry_run: false,
        }
    }

    #[test]
    fn multiple_target_languages_force_sequential_batches() {
        let batches = request(vec![2, 3], false).lang_batches();
        assert_eq!(batches, vec![vec![2], vec![3]]);
    }

    #[test]
    fn single_language_allows_one_batch() {
        let batches = request(vec![2], false).lang_batches();
        assert_eq!(batches, vec![vec![2]]);
    }

    #[test]
    fn flag_forces_sequential_even_for_single_language() {
        let batches = request(vec![2], true).lang_batches();
        assert_eq!(batches, vec![vec![2]]);
    }

    #[test]
    fn from_payload_carries_only_the_slice() {
        let payload = JobPayload {
            profile_id: 7,
            prefix: "ps_".into(),
            id_shop: 2,
            id_shop_from: 1,
            lang_from_id: 1,
            lang_to_ids: vec![2, 3],
            product_ids: vec![10, 11, 12, 13],
            prompt_id: "catalog-v2".into(),
            fields: vec!["name".into()],
            include_features: true,
            include_attributes: false,
            include_attachments: false,
            include_images: false,
            one_lang_per_prompt: false,
            chunk_size: 2,
            cursor_index: 2,
        };
        let request = ChunkRequest::from_payload(42, &payload, payload.next_slice());
        assert_eq!(request.run_id, 42);
        assert_eq!(request.product_ids, vec![12, 13]);
        assert_eq!(request.profile_id, 7);
        assert!(!request.dry_run);
    }

    #[test]
    fn unit_report_serializes_outcome_inline() {
        let report = UnitReport::new(
            10,
            Some(2),
            UnitOutcome::Failed {
                code: TroubleCode::PromptFailed,
            },
        )
        .with_message("endpoint returned 500");
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["product_id"], 10);
        assert_eq!(value["lang_id"], 2);
        assert_eq!(value["outcome"], "failed");
        assert_eq!(value["code"], "prompt_failed");
        assert_eq!(value["message"], "endpoint returned 500");
    }

    #[test]
    fn skip_report_has_no_lang() {
        let report = UnitReport::new(
            11,
            None,
            UnitOutcome::Skipped {
                reason: "source_missing".into(),
            },
        );
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["lang_id"].is_null());
        assert_eq!(value["reason"], "source_missing");
    }
}
