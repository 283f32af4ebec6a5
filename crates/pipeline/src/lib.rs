//! The bulk-translation pipeline: chunk executor and worker loop.
//!
//! The worker loop claims one job per tick and hands its next product slice
//! to the chunk executor — the same executor manual single-chunk requests
//! go through, so the async and manual paths cannot diverge in behavior.

pub mod chunk;
pub mod executor;
pub mod worker;

pub use chunk::{ChunkOutcome, ChunkRequest, UnitReport};
pub use executor::{CatalogFactory, ChunkExecutor, MySqlCatalogFactory, PipelineError};
pub use worker::WorkerRunner;
