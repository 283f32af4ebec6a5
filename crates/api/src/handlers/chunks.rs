//! Handler for manual chunk execution.
//!
//! This is the same code path the worker loop drives: a pre-sliced product
//! list processed synchronously, with partial success reported per unit.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use lexiport_core::error::CoreError;
use lexiport_db::repositories::RunRepo;
use lexiport_pipeline::ChunkRequest;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/chunks
///
/// Execute one chunk synchronously against an existing run. The response
/// carries every unit's outcome — mixed results are normal, not an error.
pub async fn execute_chunk(
    State(state): State<AppState>,
    Json(request): Json<ChunkRequest>,
) -> AppResult<impl IntoResponse> {
    RunRepo::find_by_id(&state.pool, request.run_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Run",
            id: request.run_id,
        }))?;

    if request.product_ids.is_empty() {
        return Err(AppError::BadRequest(
            "Chunk request carries no products".to_string(),
        ));
    }

    tracing::info!(
        run_id = request.run_id,
        products = request.product_ids.len(),
        dry_run = request.dry_run,
        "Manual chunk execution",
    );

    let outcome = state.executor.execute(&request).await?;
    Ok(Json(DataResponse { data: outcome }))
}
