//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the `Deserialize` DTOs its handlers accept.

pub mod job;
pub mod profile;
pub mod prompt_metric;
pub mod run;
pub mod run_item;
pub mod status;
pub mod trouble;
