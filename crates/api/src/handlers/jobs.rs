//! Handlers for the `/jobs` resource: create, inspect, cancel.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use validator::Validate;

use lexiport_core::error::CoreError;
use lexiport_core::types::DbId;
use lexiport_db::models::job::CreateJob;
use lexiport_db::models::run::RunParams;
use lexiport_db::repositories::{JobRepo, RunRepo};

use crate::error::{AppError, AppResult};
use crate::response::{CreatedJob, DataResponse};
use crate::state::AppState;

/// Reason stored on jobs cancelled through the API.
const CANCEL_REASON: &str = "Cancelled by operator";

/// POST /api/v1/jobs
///
/// Accept a bulk translation request: creates the owning run (with
/// `requested = products × target languages`) and one queued job the
/// worker loop will pick up. Returns 201 with both ids.
pub async fn create_job(
    State(state): State<AppState>,
    Json(input): Json<CreateJob>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let requested = (input.product_ids.len() * input.lang_to_ids.len()) as i64;
    let params = RunParams::from_request(&input);
    let run = RunRepo::create(&state.pool, requested, &params).await?;

    let payload = params.job_payload(input.product_ids.clone(), input.lang_to_ids.clone());
    let job = JobRepo::submit(&state.pool, run.id, input.org_id, &payload).await?;

    tracing::info!(
        job_id = job.id,
        run_id = run.id,
        products = input.product_ids.len(),
        languages = input.lang_to_ids.len(),
        "Bulk translation job queued",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedJob {
                job_id: job.id,
                run_id: run.id,
            },
        }),
    ))
}

/// GET /api/v1/jobs/{id}
///
/// Read-only projection of one job, payload cursor included.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Job", id }))?;

    Ok(Json(DataResponse { data: job }))
}

/// POST /api/v1/jobs/{id}/cancel
///
/// Mark the job failed and its run failed unless the run already
/// completed. Partial writes stay — incremental commit means cancellation
/// never rolls anything back. Returns 409 if the job already finished.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let job = JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Job", id }))?;

    let cancelled = JobRepo::fail(&state.pool, id, CANCEL_REASON).await?;
    if !cancelled {
        return Err(AppError::Core(CoreError::Conflict(
            "Job already finished".to_string(),
        )));
    }

    if let Some(run_id) = job.run_id {
        RunRepo::mark_failed(&state.pool, run_id).await?;
    }

    tracing::info!(job_id = id, "Job cancelled");

    let job = JobRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Job", id }))?;
    Ok(Json(DataResponse { data: job }))
}
