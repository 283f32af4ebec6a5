//! Per-(run, product) outcome snapshots. Append-only audit log.

use serde::Serialize;
use sqlx::FromRow;
use lexiport_core::types::{DbId, ProductId, Timestamp};

/// A row from the `run_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RunItem {
    pub id: DbId,
    pub run_id: DbId,
    pub product_id: ProductId,
    pub updated: bool,
    /// `ok | updated | skipped | error`.
    pub status: String,
    pub message: Option<String>,
    pub created_at: Timestamp,
}
