//! Route definition for manual chunk execution.

use axum::routing::post;
use axum::Router;

use crate::handlers::chunks;
use crate::state::AppState;

/// Routes mounted at `/chunks`.
///
/// ```text
/// POST   /                -> execute_chunk
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(chunks::execute_chunk))
}
