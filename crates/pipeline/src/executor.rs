//! The chunk executor: one bounded batch of (product, language) units.
//!
//! Failures never unwind past a unit: one bad product or language records
//! its trouble row and the chunk keeps going. Only chunk-level failures
//! (profile missing, catalog unreachable, queue database down) propagate,
//! and those leave the job cursor untouched for the next tick.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use lexiport_catalog::{CatalogError, CatalogStore, MySqlCatalog, RelatedKind};
use lexiport_core::fields::{self, Validation};
use lexiport_core::instruction::PromptInstruction;
use lexiport_core::outcome::{TroubleCode, UnitOutcome};
use lexiport_core::slug::slugify;
use lexiport_core::types::{DbId, LangId, ProductId};
use lexiport_db::models::profile::ConnectionProfile;
use lexiport_db::models::run::{Counters, RunProgress};
use lexiport_db::repositories::{ProfileRepo, PromptMetricRepo, RunItemRepo, RunRepo, TroubleRepo};
use lexiport_db::DbPool;
use lexiport_events::{names, ProgressBus, ProgressEvent};
use lexiport_promptgen::{PromptClient, PromptError, PromptOutput, PromptRequest};

use crate::chunk::{ChunkOutcome, ChunkRequest, UnitReport};

/// Character budget for generated-text previews on the progress stream.
const PREVIEW_CHARS: usize = 200;

/// Chunk-level failures. Unit-level failures never surface here; they are
/// recorded in the trouble ledger instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Connection profile {0} not found")]
    ProfileNotFound(DbId),

    #[error("Catalog connection failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Queue database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Opens a catalog connection scope for one chunk. A seam so tests can
/// substitute an in-memory catalog.
#[async_trait]
pub trait CatalogFactory: Send + Sync {
    async fn open(
        &self,
        profile: &ConnectionProfile,
        prefix: &str,
    ) -> Result<Box<dyn CatalogStore>, CatalogError>;
}

/// Production factory: one MySQL connection scope per chunk, closed when
/// the chunk ends rather than pooled across chunks.
pub struct MySqlCatalogFactory;

#[async_trait]
impl CatalogFactory for MySqlCatalogFactory {
    async fn open(
        &self,
        profile: &ConnectionProfile,
        prefix: &str,
    ) -> Result<Box<dyn CatalogStore>, CatalogError> {
        let catalog = MySqlCatalog::connect(&profile.url(), prefix).await?;
        Ok(Box::new(catalog))
    }
}

/// Executes one chunk of translation units. Shared by the worker loop and
/// the manual chunk endpoint, so the two paths cannot diverge.
pub struct ChunkExecutor {
    pool: DbPool,
    prompt: Arc<dyn PromptClient>,
    catalogs: Arc<dyn CatalogFactory>,
    bus: Arc<ProgressBus>,
}

impl ChunkExecutor {
    pub fn new(
        pool: DbPool,
        prompt: Arc<dyn PromptClient>,
        catalogs: Arc<dyn CatalogFactory>,
        bus: Arc<ProgressBus>,
    ) -> Self {
        Self {
            pool,
            prompt,
            catalogs,
            bus,
        }
    }

    /// Process every (product, language) unit of the chunk, in product
    /// order, persisting partial results continuously.
    pub async fn execute(&self, request: &ChunkRequest) -> Result<ChunkOutcome, PipelineError> {
        let profile = ProfileRepo::find_by_id(&self.pool, request.profile_id)
            .await?
            .ok_or(PipelineError::ProfileNotFound(request.profile_id))?;
        let catalog = self.catalogs.open(&profile, &request.prefix).await?;

        let result = self.run_chunk(request, catalog.as_ref()).await;
        catalog.close().await;
        result
    }

    async fn run_chunk(
        &self,
        request: &ChunkRequest,
        catalog: &dyn CatalogStore,
    ) -> Result<ChunkOutcome, PipelineError> {
        self.publish(
            request.run_id,
            names::CHUNK_START,
            serde_json::json!({
                "products": request.product_ids,
                "languages": request.lang_to_ids,
                "dry_run": request.dry_run,
            }),
        );

        let mut items = Vec::new();
        let mut stats = Counters::default();

        for &product_id in &request.product_ids {
            let before = items.len();
            self.process_product(request, catalog, product_id, &mut items)
                .await?;

            let delta = chunk_delta(&items[before..]);
            stats.add(&delta);

            let run = RunRepo::bump_totals(&self.pool, request.run_id, &delta).await?;
            self.publish(
                request.run_id,
                names::TOTALS_UPDATE,
                serde_json::json!({
                    "requested": run.requested,
                    "done": run.done,
                    "updated": run.updated,
                    "skipped": run.skipped,
                    "errors": run.errors,
                }),
            );
        }

        if let Some(&last_product_id) = request.product_ids.last() {
            let progress = RunProgress {
                last_product_id,
                last_chunk: stats,
            };
            RunRepo::store_progress(&self.pool, request.run_id, &progress).await?;
        }

        Ok(ChunkOutcome {
            items,
            stats,
            dry_run: request.dry_run,
        })
    }

    async fn process_product(
        &self,
        request: &ChunkRequest,
        catalog: &dyn CatalogStore,
        product_id: ProductId,
        items: &mut Vec<UnitReport>,
    ) -> Result<(), PipelineError> {
        self.publish(
            request.run_id,
            names::PRODUCT_START,
            serde_json::json!({ "product_id": product_id }),
        );

        let active = match catalog.product_active(product_id, request.id_shop).await {
            Ok(active) => active,
            Err(err) => {
                return self
                    .fail_product(request, product_id, &err, items)
                    .await
                    .map_err(Into::into);
            }
        };
        if !active {
            return self
                .skip_product(request, product_id, "inactive", items)
                .await
                .map_err(Into::into);
        }

        let source = match catalog
            .fetch_source_fields(
                product_id,
                request.id_shop_from,
                request.lang_from_id,
                &request.fields,
            )
            .await
        {
            Ok(Some(source)) => source,
            Ok(None) => {
                return self
                    .skip_product(request, product_id, "source_missing", items)
                    .await
                    .map_err(Into::into);
            }
            Err(err) => {
                return self
                    .fail_product(request, product_id, &err, items)
                    .await
                    .map_err(Into::into);
            }
        };

        let before = items.len();
        for batch in request.lang_batches() {
            self.process_batch(request, catalog, product_id, &source, &batch, items)
                .await?;
        }
        let reports = &items[before..];

        let updated = reports
            .iter()
            .any(|r| matches!(r.outcome, UnitOutcome::Applied));
        let status = product_status(reports);
        let message = reports.iter().find_map(|r| r.message.clone());

        RunItemRepo::append(
            &self.pool,
            request.run_id,
            product_id,
            updated,
            status,
            message.as_deref(),
        )
        .await?;

        self.publish(
            request.run_id,
            names::PRODUCT_DONE,
            serde_json::json!({ "product_id": product_id, "status": status }),
        );
        Ok(())
    }

    /// One generation call covering `langs`, then per-language validation
    /// and application.
    async fn process_batch(
        &self,
        request: &ChunkRequest,
        catalog: &dyn CatalogStore,
        product_id: ProductId,
        source: &BTreeMap<String, String>,
        langs: &[LangId],
        items: &mut Vec<UnitReport>,
    ) -> Result<(), PipelineError> {
        let mut metrics = Vec::with_capacity(langs.len());
        for &lang in langs {
            let metric_id =
                PromptMetricRepo::start(&self.pool, request.run_id, product_id, lang).await?;
            metrics.push((lang, metric_id));
        }

        let instruction = PromptInstruction::build(
            product_id,
            request.lang_from_id,
            langs,
            &request.fields,
            source,
        );
        let prompt_request = PromptRequest::new(&request.prompt_id, instruction);

        self.publish(
            request.run_id,
            names::PROMPT_REQUEST,
            serde_json::json!({
                "product_id": product_id,
                "languages": langs,
                "request_id": prompt_request.request_id,
            }),
        );

        let started = Instant::now();
        let output = self.prompt.generate(&prompt_request).await;
        let prompt_ms = started.elapsed().as_millis() as i64;

        let output = match output {
            Ok(output) => output,
            Err(err) => {
                let code = match err {
                    PromptError::Decode(_) => TroubleCode::InvalidOutput,
                    PromptError::Transport(_) | PromptError::Status(..) => {
                        TroubleCode::PromptFailed
                    }
                };
                self.publish(
                    request.run_id,
                    names::PROMPT_ERROR,
                    serde_json::json!({
                        "product_id": product_id,
                        "message": err.to_string(),
                    }),
                );
                for (lang, metric_id) in metrics {
                    TroubleRepo::record(
                        &self.pool,
                        request.run_id,
                        product_id,
                        lang,
                        code,
                        &err.to_string(),
                    )
                    .await?;
                    PromptMetricRepo::finish(&self.pool, metric_id, prompt_ms, None).await?;
                    items.push(
                        UnitReport::new(product_id, Some(lang), UnitOutcome::Failed { code })
                            .with_message(err.to_string()),
                    );
                }
                return Ok(());
            }
        };

        self.publish(
            request.run_id,
            names::PROMPT_RECEIVED,
            serde_json::json!({ "product_id": product_id, "elapsed_ms": prompt_ms }),
        );
        self.publish(
            request.run_id,
            names::PROMPT_OUTPUT,
            serde_json::json!({
                "product_id": product_id,
                "preview": output_preview(&output),
            }),
        );

        for (lang, metric_id) in metrics {
            let (report, rel_prompt_ms) = self
                .apply_unit(request, catalog, product_id, lang, source, &output)
                .await?;
            PromptMetricRepo::finish(&self.pool, metric_id, prompt_ms, rel_prompt_ms).await?;
            items.push(report);
        }
        Ok(())
    }

    /// Validate and apply one language's output. Returns the unit report
    /// plus the time spent on related-entity translation, if any.
    async fn apply_unit(
        &self,
        request: &ChunkRequest,
        catalog: &dyn CatalogStore,
        product_id: ProductId,
        lang: LangId,
        source: &BTreeMap<String, String>,
        output: &PromptOutput,
    ) -> Result<(UnitReport, Option<i64>), PipelineError> {
        let Some(generated) = output.for_lang(lang) else {
            let message = format!("No output document for language {lang}");
            TroubleRepo::record(
                &self.pool,
                request.run_id,
                product_id,
                lang,
                TroubleCode::TargetMissing,
                &message,
            )
            .await?;
            let report = UnitReport::new(
                product_id,
                Some(lang),
                UnitOutcome::Failed {
                    code: TroubleCode::TargetMissing,
                },
            )
            .with_message(message);
            return Ok((report, None));
        };

        let mut values = match fields::validate_output(&request.fields, generated, source) {
            Validation::Ok(values) => values,
            Validation::MissingFields(missing) => {
                let message = format!("Missing generated fields: {}", missing.join(", "));
                TroubleRepo::record(
                    &self.pool,
                    request.run_id,
                    product_id,
                    lang,
                    TroubleCode::InvalidFields,
                    &message,
                )
                .await?;
                let report = UnitReport::new(
                    product_id,
                    Some(lang),
                    UnitOutcome::Failed {
                        code: TroubleCode::InvalidFields,
                    },
                )
                .with_message(message);
                return Ok((report, None));
            }
        };

        // The slug follows the translated title whether or not the caller
        // listed it as an output field.
        if let Some(name) = values.get(fields::FIELD_NAME) {
            let slug = fields::normalize_value(fields::FIELD_LINK_REWRITE, &slugify(name));
            values.insert(fields::FIELD_LINK_REWRITE.to_string(), slug);
        }

        if request.dry_run {
            return Ok((
                UnitReport::new(product_id, Some(lang), UnitOutcome::Preview),
                None,
            ));
        }

        self.publish(
            request.run_id,
            names::DB_UPDATE_START,
            serde_json::json!({ "product_id": product_id, "lang_id": lang }),
        );

        let outcome = match catalog
            .apply_translation(product_id, request.id_shop, lang, &values)
            .await
        {
            Ok(rows) => {
                self.publish(
                    request.run_id,
                    names::DB_UPDATE_DONE,
                    serde_json::json!({
                        "product_id": product_id,
                        "lang_id": lang,
                        "rows": rows,
                    }),
                );
                if rows > 0 {
                    UnitOutcome::Applied
                } else {
                    UnitOutcome::Unchanged
                }
            }
            Err(err) => {
                let code = err.trouble_code();
                self.publish(
                    request.run_id,
                    names::DB_UPDATE_ERROR,
                    serde_json::json!({
                        "product_id": product_id,
                        "lang_id": lang,
                        "message": err.to_string(),
                    }),
                );
                TroubleRepo::record(
                    &self.pool,
                    request.run_id,
                    product_id,
                    lang,
                    code,
                    &err.to_string(),
                )
                .await?;
                let report = UnitReport::new(product_id, Some(lang), UnitOutcome::Failed { code })
                    .with_message(err.to_string());
                return Ok((report, None));
            }
        };

        let rel_prompt_ms = if request.include_features
            || request.include_attributes
            || request.include_attachments
            || request.include_images
        {
            let started = Instant::now();
            self.translate_related(request, catalog, product_id, lang)
                .await;
            Some(started.elapsed().as_millis() as i64)
        } else {
            None
        };

        Ok((
            UnitReport::new(product_id, Some(lang), outcome),
            rel_prompt_ms,
        ))
    }

    /// Best-effort translation of related-entity texts. Failures here are
    /// logged and never affect the unit's classification.
    async fn translate_related(
        &self,
        request: &ChunkRequest,
        catalog: &dyn CatalogStore,
        product_id: ProductId,
        lang: LangId,
    ) {
        let kinds = [
            (request.include_features, RelatedKind::Feature),
            (request.include_attributes, RelatedKind::Attribute),
            (request.include_attachments, RelatedKind::Attachment),
            (request.include_images, RelatedKind::ImageCaption),
        ];

        for (enabled, kind) in kinds {
            if !enabled {
                continue;
            }
            if let Err(err) = self
                .translate_related_kind(request, catalog, product_id, lang, kind)
                .await
            {
                tracing::warn!(
                    product_id,
                    lang_id = lang,
                    kind = kind.as_str(),
                    error = %err,
                    "Related-entity translation failed, continuing",
                );
            }
        }
    }

    async fn translate_related_kind(
        &self,
        request: &ChunkRequest,
        catalog: &dyn CatalogStore,
        product_id: ProductId,
        lang: LangId,
        kind: RelatedKind,
    ) -> Result<(), RelatedError> {
        let texts = catalog
            .fetch_related(kind, product_id, request.lang_from_id)
            .await?;
        if texts.is_empty() {
            return Ok(());
        }

        // Related texts travel through the same generation call as product
        // fields, keyed by synthetic field names carrying the entity id.
        let source: BTreeMap<String, String> = texts
            .iter()
            .map(|t| (format!("text_{}", t.id), t.text.clone()))
            .collect();
        let names_list: Vec<String> = source.keys().cloned().collect();

        let instruction = PromptInstruction::build(
            product_id,
            request.lang_from_id,
            &[lang],
            &names_list,
            &source,
        );
        let output = self
            .prompt
            .generate(&PromptRequest::new(&request.prompt_id, instruction))
            .await?;
        let Some(generated) = output.for_lang(lang) else {
            return Ok(());
        };

        let mut applied = 0u64;
        for text in &texts {
            let key = format!("text_{}", text.id);
            if let Some(translated) = generated.get(&key).filter(|v| !v.trim().is_empty()) {
                applied += catalog.apply_related(kind, text.id, lang, translated).await?;
            }
        }

        self.publish(
            request.run_id,
            names::DB_RELATED_UPDATE,
            serde_json::json!({
                "product_id": product_id,
                "lang_id": lang,
                "kind": kind.as_str(),
                "rows": applied,
            }),
        );
        Ok(())
    }

    /// Product-scoped skip: one report, one run item, no trouble row.
    async fn skip_product(
        &self,
        request: &ChunkRequest,
        product_id: ProductId,
        reason: &str,
        items: &mut Vec<UnitReport>,
    ) -> Result<(), sqlx::Error> {
        let outcome = UnitOutcome::Skipped {
            reason: reason.to_string(),
        };
        let status = outcome.item_status();
        items.push(UnitReport::new(product_id, None, outcome));
        RunItemRepo::append(
            &self.pool,
            request.run_id,
            product_id,
            false,
            status,
            Some(reason),
        )
        .await?;
        self.publish(
            request.run_id,
            names::PRODUCT_DONE,
            serde_json::json!({
                "product_id": product_id,
                "status": status,
                "reason": reason,
            }),
        );
        Ok(())
    }

    /// Product-scoped catalog failure: every pending language unit gets a
    /// trouble row so each stays independently retryable.
    async fn fail_product(
        &self,
        request: &ChunkRequest,
        product_id: ProductId,
        err: &CatalogError,
        items: &mut Vec<UnitReport>,
    ) -> Result<(), sqlx::Error> {
        let code = err.trouble_code();
        let status = UnitOutcome::Failed { code }.item_status();
        let message = err.to_string();
        tracing::warn!(product_id, error = %message, "Product-scoped catalog failure");

        for &lang in &request.lang_to_ids {
            TroubleRepo::record(&self.pool, request.run_id, product_id, lang, code, &message)
                .await?;
            items.push(
                UnitReport::new(product_id, Some(lang), UnitOutcome::Failed { code })
                    .with_message(message.clone()),
            );
        }
        RunItemRepo::append(
            &self.pool,
            request.run_id,
            product_id,
            false,
            status,
            Some(&message),
        )
        .await?;
        self.publish(
            request.run_id,
            names::PRODUCT_DONE,
            serde_json::json!({ "product_id": product_id, "status": status }),
        );
        Ok(())
    }

    fn publish(&self, run_id: DbId, event: &str, payload: serde_json::Value) {
        self.bus
            .publish(run_id, ProgressEvent::new(event).with_payload(payload));
    }
}

/// Errors inside best-effort related-entity translation.
#[derive(Debug, thiserror::Error)]
enum RelatedError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

/// Snapshot status for a product's unit reports. The worst outcome wins:
/// any failed unit marks the product `error`, any applied unit marks it
/// `updated`, and the unchanged rest is `ok`.
fn product_status(reports: &[UnitReport]) -> &'static str {
    reports
        .iter()
        .find(|r| matches!(r.outcome, UnitOutcome::Failed { .. }))
        .or_else(|| {
            reports
                .iter()
                .find(|r| matches!(r.outcome, UnitOutcome::Applied))
        })
        .map(|r| r.outcome.item_status())
        .unwrap_or("ok")
}

/// Aggregate a product's unit reports into counter deltas.
///
/// `done` counts every unit whose generation completed (applied, unchanged,
/// or previewed); product-scoped skips count once per product.
fn chunk_delta(reports: &[UnitReport]) -> Counters {
    let mut delta = Counters::default();
    for report in reports {
        match &report.outcome {
            UnitOutcome::Applied => {
                delta.done += 1;
                delta.updated += 1;
            }
            UnitOutcome::Unchanged | UnitOutcome::Preview => delta.done += 1,
            UnitOutcome::Skipped { .. } => delta.skipped += 1,
            UnitOutcome::Failed { .. } => delta.errors += 1,
        }
    }
    delta
}

/// Truncated per-language preview of generated text for the progress
/// stream.
fn output_preview(output: &PromptOutput) -> serde_json::Value {
    let preview: BTreeMap<&String, BTreeMap<&String, String>> = output
        .outputs
        .iter()
        .map(|(lang, doc)| {
            let doc = doc
                .iter()
                .map(|(field, value)| (field, fields::truncate_chars(value, PREVIEW_CHARS)))
                .collect();
            (lang, doc)
        })
        .collect();
    serde_json::to_value(preview).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: UnitOutcome) -> UnitReport {
        UnitReport::new(10, Some(2), outcome)
    }

    #[test]
    fn delta_counts_applied_as_done_and_updated() {
        let delta = chunk_delta(&[
            report(UnitOutcome::Applied),
            report(UnitOutcome::Unchanged),
            report(UnitOutcome::Failed {
                code: TroubleCode::PromptFailed,
            }),
        ]);
        assert_eq!(delta.done, 2);
        assert_eq!(delta.updated, 1);
        assert_eq!(delta.errors, 1);
        assert_eq!(delta.skipped, 0);
    }

    #[test]
    fn delta_counts_preview_as_done() {
        let delta = chunk_delta(&[report(UnitOutcome::Preview), report(UnitOutcome::Preview)]);
        assert_eq!(delta.done, 2);
        assert_eq!(delta.updated, 0);
    }

    #[test]
    fn delta_counts_product_skip_once() {
        let delta = chunk_delta(&[UnitReport::new(
            11,
            None,
            UnitOutcome::Skipped {
                reason: "inactive".into(),
            },
        )]);
        assert_eq!(delta.skipped, 1);
        assert_eq!(delta.done, 0);
    }

    #[test]
    fn product_status_is_worst_of_units() {
        assert_eq!(
            product_status(&[
                report(UnitOutcome::Applied),
                report(UnitOutcome::Failed {
                    code: TroubleCode::DbError,
                }),
            ]),
            "error"
        );
        assert_eq!(
            product_status(&[report(UnitOutcome::Unchanged), report(UnitOutcome::Applied)]),
            "updated"
        );
        assert_eq!(
            product_status(&[report(UnitOutcome::Unchanged), report(UnitOutcome::Preview)]),
            "ok"
        );
        assert_eq!(product_status(&[]), "ok");
    }

    #[test]
    fn preview_truncates_long_values() {
        let output = PromptOutput {
            outputs: [(
                "2".to_string(),
                [("description".to_string(), "x".repeat(5000))]
                    .into_iter()
                    .collect(),
            )]
            .into_iter()
            .collect(),
        };
        let preview = output_preview(&output);
        assert_eq!(
            preview["2"]["description"].as_str().unwrap().chars().count(),
            PREVIEW_CHARS
        );
    }
}
