pub mod chunks;
pub mod health;
pub mod jobs;
pub mod runs;
pub mod troubles;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /jobs                               create (POST)
/// /jobs/{id}                          get
/// /jobs/{id}/cancel                   cancel job + run (POST)
///
/// /runs                               create, list
/// /runs/{id}                          get (run + items)
/// /runs/{id}/retry                    whole-run / ad-hoc retry (POST)
/// /runs/{id}/retry/lang               single (product, language) retry (POST)
/// /runs/{id}/metrics/avg-by-language  prompt timing averages
/// /runs/{id}/stream                   SSE progress stream
///
/// /troubles                           list
/// /troubles/{id}/retry                single-trouble retry (POST)
/// /troubles/{id}/resolve              manual resolution (POST)
///
/// /chunks                             manual chunk execution (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/jobs", jobs::router())
        .nest("/runs", runs::router())
        .nest("/troubles", troubles::router())
        .nest("/chunks", chunks::router())
}
