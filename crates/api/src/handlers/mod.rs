//! HTTP request handlers, one module per resource.

pub mod chunks;
pub mod jobs;
pub mod runs;
pub mod stream;
pub mod troubles;
