//! Handlers for the `/troubles` resource: the per-unit retry ledger.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use lexiport_core::error::CoreError;
use lexiport_core::types::DbId;
use lexiport_db::models::status::TroubleStatus;
use lexiport_db::models::trouble::TroubleListQuery;
use lexiport_db::repositories::{JobRepo, RunRepo, TroubleRepo};

use crate::error::{AppError, AppResult};
use crate::response::{CreatedJob, DataResponse};
use crate::state::AppState;

/// GET /api/v1/troubles
///
/// List trouble entries, newest first. `status` filters by name
/// (`open | queued | resolved`), `run_id` narrows to one run.
pub async fn list_troubles(
    State(state): State<AppState>,
    Query(params): Query<TroubleListQuery>,
) -> AppResult<impl IntoResponse> {
    let status_id = match params.status.as_deref() {
        Some(name) => Some(
            TroubleStatus::from_name(name)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown trouble status: {name}")))?
                .id(),
        ),
        None => None,
    };

    let troubles = TroubleRepo::list(&state.pool, status_id, &params).await?;
    Ok(Json(DataResponse { data: troubles }))
}

/// POST /api/v1/troubles/{id}/retry
///
/// Queue a retry job for exactly this trouble's (product, language) pair,
/// scoped by the owning run's stored params, and transition the trouble to
/// `queued`.
pub async fn retry_trouble(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let trouble = TroubleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Trouble",
            id,
        }))?;

    let run = RunRepo::find_by_id(&state.pool, trouble.run_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Run",
            id: trouble.run_id,
        }))?;
    let params = run.params()?;

    let payload = params.job_payload(vec![trouble.product_id], vec![trouble.lang_id]);
    let job = JobRepo::submit(&state.pool, run.id, None, &payload).await?;
    TroubleRepo::mark_queued(&state.pool, id).await?;

    tracing::info!(
        trouble_id = id,
        job_id = job.id,
        run_id = run.id,
        product_id = trouble.product_id,
        lang_id = trouble.lang_id,
        "Trouble retry queued",
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

/// POST /api/v1/troubles/{id}/resolve
///
/// Mark a trouble resolved without retrying. Returns 409 if it already
/// was.
pub async fn resolve_trouble(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    TroubleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Trouble",
            id,
        }))?;

    let resolved = TroubleRepo::resolve(&state.pool, id).await?;
    if !resolved {
        return Err(AppError::Core(CoreError::Conflict(
            "Trouble already resolved".to_string(),
        )));
    }

    let trouble = TroubleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Trouble",
            id,
        }))?;
    Ok(Json(DataResponse { data: trouble }))
}
