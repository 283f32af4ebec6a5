//! Live-progress infrastructure for bulk-translation runs.
//!
//! - [`ProgressEvent`] — the canonical progress envelope.
//! - [`ProgressBus`] — per-run publish/subscribe registry backed by
//!   `tokio::sync::broadcast`, one topic per run id.
//!
//! The bus is an observability feed, not a source of truth: the run ledger
//! stays authoritative, and publishing never blocks on absent listeners.

pub mod bus;
pub mod progress;

pub use bus::ProgressBus;
pub use progress::{names, ProgressEvent};
