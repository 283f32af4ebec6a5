//! External shop-catalog access.
//!
//! The catalog is a foreign database the pipeline reads source text from
//! and writes translations to, but does not own. [`CatalogStore`] is the
//! seam the chunk executor works against; [`MySqlCatalog`] is the real
//! implementation. The connection is treated as flaky: a narrow set of
//! error signatures earns exactly one reconnect-and-retry per statement.

pub mod error;
pub mod mysql;
pub mod prefix;
pub mod store;

pub use error::CatalogError;
pub use mysql::MySqlCatalog;
pub use store::{CatalogStore, RelatedKind, RelatedText};
