//! Trouble ledger: one row per failed (run, product, language) unit.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use lexiport_core::types::{DbId, LangId, ProductId, Timestamp};

use super::status::StatusId;

/// A row from the `troubles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Trouble {
    pub id: DbId,
    pub run_id: DbId,
    pub product_id: ProductId,
    pub lang_id: LangId,
    /// Stable machine-readable failure category (`prompt_failed`, …).
    pub code: String,
    pub message: Option<String>,
    pub status_id: StatusId,
    pub attempts: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Query parameters for `GET /api/v1/troubles`.
#[derive(Debug, Deserialize)]
pub struct TroubleListQuery {
    /// Status name filter: `open | queued | resolved`.
    pub status: Option<String>,
    pub run_id: Option<DbId>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
