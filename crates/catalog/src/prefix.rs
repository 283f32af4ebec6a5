//! Allow-list validation for identifiers interpolated into catalog SQL.
//!
//! The catalog's table names carry a caller-supplied prefix, and the field
//! list maps to column names. Both travel through `format!` into statements,
//! so both must pass these patterns before any interpolation.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::CatalogError;

static PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,64}$").expect("static prefix pattern"));

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("static ident pattern"));

/// Validate a table-name prefix (e.g. `ps_`).
pub fn validate_prefix(prefix: &str) -> Result<(), CatalogError> {
    if PREFIX_RE.is_match(prefix) {
        Ok(())
    } else {
        Err(CatalogError::InvalidIdentifier(format!(
            "table prefix {prefix:?} is not allow-listed"
        )))
    }
}

/// Validate a column identifier (requested field name).
pub fn validate_identifier(name: &str) -> Result<(), CatalogError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(CatalogError::InvalidIdentifier(format!(
            "identifier {name:?} is not allow-listed"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_prefixes_pass() {
        assert!(validate_prefix("ps_").is_ok());
        assert!(validate_prefix("shop2021_").is_ok());
        assert!(validate_prefix("_").is_ok());
    }

    #[test]
    fn injection_attempts_fail() {
        assert!(validate_prefix("ps_`; DROP TABLE x; --").is_err());
        assert!(validate_prefix("ps_ product").is_err());
        assert!(validate_prefix("ps-").is_err());
        assert!(validate_prefix("").is_err());
    }

    #[test]
    fn overlong_prefix_fails() {
        assert!(validate_prefix(&"a".repeat(65)).is_err());
    }

    #[test]
    fn field_identifiers() {
        assert!(validate_identifier("meta_title").is_ok());
        assert!(validate_identifier("link_rewrite").is_ok());
        assert!(validate_identifier("1name").is_err());
        assert!(validate_identifier("name; --").is_err());
        assert!(validate_identifier("").is_err());
    }
}
