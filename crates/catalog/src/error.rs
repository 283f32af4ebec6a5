//! Catalog error taxonomy: flaky vs hard.
//!
//! The distinction drives the retry ledger: `Unavailable` failures are
//! worth automatic retry, `Query` failures usually indicate a schema
//! mismatch and are not.

use lexiport_core::outcome::TroubleCode;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Connection-level flake that survived one reconnect-and-retry.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// Hard statement failure (schema mismatch, constraint, syntax).
    #[error("Catalog query failed: {0}")]
    Query(String),

    /// A prefix or column name failed allow-list validation.
    #[error("Invalid catalog identifier: {0}")]
    InvalidIdentifier(String),
}

impl CatalogError {
    /// Map this error onto the trouble-ledger code for a failed unit.
    pub fn trouble_code(&self) -> TroubleCode {
        match self {
            CatalogError::Unavailable(_) => TroubleCode::DbUnavailable,
            CatalogError::Query(_) | CatalogError::InvalidIdentifier(_) => TroubleCode::DbError,
        }
    }

    /// Classify a sqlx error after the retry budget is spent.
    pub(crate) fn from_sqlx(err: sqlx::Error, retried: bool) -> Self {
        if retried || is_flaky(&err) {
            CatalogError::Unavailable(err.to_string())
        } else {
            CatalogError::Query(err.to_string())
        }
    }
}

/// Whether a sqlx error looks like a connection flake (worth one retry)
/// rather than a hard statement failure.
pub fn is_flaky(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => flaky_message(&db.message().to_lowercase()),
        other => flaky_message(&other.to_string().to_lowercase()),
    }
}

/// Error-message signatures of transient MySQL connection trouble.
fn flaky_message(message: &str) -> bool {
    const SIGNATURES: &[&str] = &[
        "connection refused",
        "connection reset",
        "broken pipe",
        "timed out",
        "timeout",
        "too many connections",
        "server has gone away",
        "lost connection",
    ];
    SIGNATURES.iter().any(|sig| message.contains(sig))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flake_signatures_match() {
        assert!(flaky_message("error 2006: mysql server has gone away"));
        assert!(flaky_message("connection refused (os error 111)"));
        assert!(flaky_message("error 1040: too many connections"));
        assert!(flaky_message("read timed out"));
    }

    #[test]
    fn hard_errors_do_not_match() {
        assert!(!flaky_message("unknown column 'meta_title' in 'field list'"));
        assert!(!flaky_message("table 'shop.ps_product_lang' doesn't exist"));
        assert!(!flaky_message("duplicate entry '10-2' for key 'primary'"));
    }

    #[test]
    fn io_errors_are_flaky() {
        let err = sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(is_flaky(&err));
        assert!(is_flaky(&sqlx::Error::PoolTimedOut));
    }

    #[test]
    fn row_not_found_is_not_flaky() {
        assert!(!is_flaky(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn trouble_code_mapping() {
        use lexiport_core::outcome::TroubleCode;
        assert_eq!(
            CatalogError::Unavailable("x".into()).trouble_code(),
            TroubleCode::DbUnavailable
        );
        assert_eq!(
            CatalogError::Query("x".into()).trouble_code(),
            TroubleCode::DbError
        );
    }
}
