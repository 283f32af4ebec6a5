//! Route definitions for the `/runs` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{runs, stream};
use crate::state::AppState;

/// Routes mounted at `/runs`.
///
/// ```text
/// GET    /                              -> list_runs
/// POST   /                              -> create_run
/// GET    /{id}                          -> get_run
/// POST   /{id}/retry                    -> retry_run
/// POST   /{id}/retry/lang               -> retry_lang
/// GET    /{id}/metrics/avg-by-language  -> metrics_avg_by_language
/// GET    /{id}/stream                   -> stream_run (SSE)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(runs::list_runs).post(runs::create_run))
        .route("/{id}", get(runs::get_run))
        .route("/{id}/retry", post(runs::retry_run))
        .route("/{id}/retry/lang", post(runs::retry_lang))
        .route(
            "/{id}/metrics/avg-by-language",
            get(runs::metrics_avg_by_language),
        )
        .route("/{id}/stream", get(stream::stream_run))
}
