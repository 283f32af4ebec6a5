//! Client for the external text-generation ("prompt") endpoint.
//!
//! The endpoint is a black box: we post a structured instruction and get
//! back per-language field documents. [`PromptClient`] is the seam the
//! chunk executor works against; [`HttpPromptClient`] is the real
//! implementation over `reqwest`.

pub mod api;
pub mod client;

pub use api::{PromptOutput, PromptRequest};
pub use client::{HttpPromptClient, PromptClient, PromptError};
