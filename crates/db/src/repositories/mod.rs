//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod job_repo;
pub mod profile_repo;
pub mod prompt_metric_repo;
pub mod run_item_repo;
pub mod run_repo;
pub mod trouble_repo;

pub use job_repo::JobRepo;
pub use profile_repo::ProfileRepo;
pub use prompt_metric_repo::PromptMetricRepo;
pub use run_item_repo::RunItemRepo;
pub use run_repo::RunRepo;
pub use trouble_repo::TroubleRepo;
