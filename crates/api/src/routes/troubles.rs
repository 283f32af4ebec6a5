//! Route definitions for the `/troubles` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::troubles;
use crate::state::AppState;

/// Routes mounted at `/troubles`.
///
/// ```text
/// GET    /                -> list_troubles
/// POST   /{id}/retry      -> retry_trouble
/// POST   /{id}/resolve    -> resolve_trouble
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(troubles::list_troubles))
        .route("/{id}/retry", post(troubles::retry_trouble))
        .route("/{id}/resolve", post(troubles::resolve_trouble))
}
