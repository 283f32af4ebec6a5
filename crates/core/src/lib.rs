//! Shared domain types for the bulk-translation pipeline.
//!
//! Everything here is pure: field catalog rules, slug derivation, outcome
//! taxonomy, and the prompt instruction shape. No I/O, no async.

pub mod error;
pub mod fields;
pub mod instruction;
pub mod outcome;
pub mod slug;
pub mod types;

pub use error::CoreError;
