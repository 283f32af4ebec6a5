//! Handlers for the `/runs` resource: ledger CRUD, retries, metrics.
//!
//! Every retry granularity derives its connection profile, field list, and
//! prompt identity from the run's stored params — never from caller input —
//! so a retry cannot silently change the semantics of a run.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use lexiport_core::error::CoreError;
use lexiport_core::types::{DbId, LangId, ProductId};
use lexiport_db::models::job::CreateJob;
use lexiport_db::models::run::{Run, RunListQuery, RunParams};
use lexiport_db::models::run_item::RunItem;
use lexiport_db::repositories::{JobRepo, PromptMetricRepo, RunItemRepo, RunRepo, TroubleRepo};

use crate::error::{AppError, AppResult};
use crate::response::{CreatedJob, DataResponse};
use crate::state::AppState;

/// Retry scope for `POST /runs/{id}/retry`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetryMode {
    /// Re-enqueue only products with open troubles.
    Failed,
    /// Re-enqueue the run's full product list.
    All,
}

/// Body of `POST /runs/{id}/retry`.
#[derive(Debug, Deserialize)]
pub struct RetryRun {
    pub mode: RetryMode,
    /// Ad-hoc scope: when present and non-empty, overrides the mode's
    /// product selection.
    pub product_ids: Option<Vec<ProductId>>,
}

/// Body of `POST /runs/{id}/retry/lang`.
#[derive(Debug, Deserialize)]
pub struct RetryLang {
    pub product_id: ProductId,
    pub id_lang: LangId,
}

/// Pagination for the item listing embedded in `GET /runs/{id}`.
#[derive(Debug, Deserialize)]
pub struct ItemsQuery {
    pub items_limit: Option<i64>,
    pub items_offset: Option<i64>,
}

/// `GET /runs/{id}` response: the run plus its outcome snapshots.
#[derive(Debug, Serialize)]
pub struct RunDetail {
    #[serde(flatten)]
    pub run: Run,
    pub items: Vec<RunItem>,
}

async fn find_run(state: &AppState, id: DbId) -> AppResult<Run> {
    RunRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Run", id }))
}

/// POST /api/v1/runs
///
/// Create a run ledger row without a queued job — the manual-chunk
/// workflow, where a client drives `POST /chunks` itself.
pub async fn create_run(
    State(state): State<AppState>,
    Json(input): Json<CreateJob>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let requested = (input.product_ids.len() * input.lang_to_ids.len()) as i64;
    let params = RunParams::from_request(&input);
    let run = RunRepo::create(&state.pool, requested, &params).await?;

    tracing::info!(run_id = run.id, requested, "Run created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: run })))
}

/// GET /api/v1/runs
///
/// List runs, newest first. Supports `status_id`, `limit`, `offset`.
pub async fn list_runs(
    State(state): State<AppState>,
    Query(params): Query<RunListQuery>,
) -> AppResult<impl IntoResponse> {
    let runs = RunRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: runs }))
}

/// GET /api/v1/runs/{id}
///
/// One run with its item listing.
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(query): Query<ItemsQuery>,
) -> AppResult<impl IntoResponse> {
    let run = find_run(&state, id).await?;
    let items =
        RunItemRepo::list_by_run(&state.pool, id, query.items_limit, query.items_offset).await?;

    Ok(Json(DataResponse {
        data: RunDetail { run, items },
    }))
}

/// POST /api/v1/runs/{id}/retry
///
/// Queue a new job against this run. `mode: "failed"` re-enqueues the
/// products with open troubles (transitioning them to `queued`);
/// `mode: "all"` re-enqueues the original product list; an explicit
/// `product_ids` array narrows either to an ad-hoc scope.
pub async fn retry_run(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<RetryRun>,
) -> AppResult<impl IntoResponse> {
    let run = find_run(&state, id).await?;
    let params = run.params()?;

    let explicit = body
        .product_ids
        .as_ref()
        .is_some_and(|ids| !ids.is_empty());
    let product_ids = if explicit {
        body.product_ids.clone().unwrap_or_default()
    } else {
        match body.mode {
            RetryMode::Failed => TroubleRepo::open_products(&state.pool, id).await?,
            RetryMode::All => params.product_ids.clone(),
        }
    };

    if product_ids.is_empty() {
        return Err(AppError::BadRequest(
            "No products to retry for this run".to_string(),
        ));
    }

    let payload = params.job_payload(product_ids, params.lang_to_ids.clone());
    let job = JobRepo::submit(&state.pool, id, None, &payload).await?;

    if body.mode == RetryMode::Failed && !explicit {
        let queued = TroubleRepo::queue_open_for_run(&state.pool, id).await?;
        tracing::info!(run_id = id, queued, "Open troubles queued for retry");
    }

    tracing::info!(job_id = job.id, run_id = id, mode = ?body.mode, "Retry job queued");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedJob {
                job_id: job.id,
                run_id: id,
            },
        }),
    ))
}

/// POST /api/v1/runs/{id}/retry/lang
///
/// Queue a single-unit retry: one product, one target language.
pub async fn retry_lang(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(body): Json<RetryLang>,
) -> AppResult<impl IntoResponse> {
    let run = find_run(&state, id).await?;
    let params = run.params()?;

    let payload = params.job_payload(vec![body.product_id], vec![body.id_lang]);
    let job = JobRepo::submit(&state.pool, id, None, &payload).await?;

    tracing::info!(
        job_id = job.id,
        run_id = id,
        product_id = body.product_id,
        lang_id = body.id_lang,
        "Single-unit retry queued",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedJob {
                job_id: job.id,
                run_id: id,
            },
        }),
    ))
}

/// GET /api/v1/runs/{id}/metrics/avg-by-language
///
/// Average prompt durations per target language, finished attempts only.
pub async fn metrics_avg_by_language(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_run(&state, id).await?;
    let averages = PromptMetricRepo::avg_by_language(&state.pool, id).await?;
    Ok(Json(DataResponse { data: averages }))
}
