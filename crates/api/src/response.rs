//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. Use [`DataResponse`]
//! instead of ad-hoc `serde_json::json!({ "data": ... })` to get
//! compile-time type safety and consistent serialization.

use serde::Serialize;

use lexiport_core::types::DbId;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Response payload for every endpoint that enqueues a job.
#[derive(Debug, Serialize)]
pub struct CreatedJob {
    pub job_id: DbId,
    pub run_id: DbId,
}
