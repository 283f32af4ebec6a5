//! Unit outcome taxonomy: what happened to one (product, language) pair.

use serde::{Deserialize, Serialize};

/// Machine-readable failure categories recorded in the trouble ledger.
///
/// Every variant is independently retryable at (product, language)
/// granularity. Product-scoped skips (`source_missing`, inactive product)
/// are deliberately *not* trouble codes: re-running them cannot change the
/// outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TroubleCode {
    /// The text-generation call failed (transport or non-2xx status).
    PromptFailed,
    /// The generation response could not be parsed.
    InvalidOutput,
    /// Requested fields missing from the output with no safe fallback.
    InvalidFields,
    /// The output carried no document for the target language.
    TargetMissing,
    /// Hard catalog database error (usually a schema mismatch).
    DbError,
    /// Catalog connection flake that survived one reconnect-and-retry.
    DbUnavailable,
}

impl TroubleCode {
    pub fn as_str(self) -> &'static str {
        match self {
            TroubleCode::PromptFailed => "prompt_failed",
            TroubleCode::InvalidOutput => "invalid_output",
            TroubleCode::InvalidFields => "invalid_fields",
            TroubleCode::TargetMissing => "target_missing",
            TroubleCode::DbError => "db_error",
            TroubleCode::DbUnavailable => "db_unavailable",
        }
    }

    /// Whether the failure is worth automatic retry. `db_error` usually
    /// indicates a schema mismatch and is excluded.
    pub fn auto_retryable(self) -> bool {
        !matches!(self, TroubleCode::DbError)
    }
}

impl std::fmt::Display for TroubleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final classification of one processed unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum UnitOutcome {
    /// The destination row was updated.
    Applied,
    /// The targeted update matched zero rows. Not an error.
    Unchanged,
    /// Dry-run: generation ran, the write was skipped.
    Preview,
    /// Product-scoped skip (inactive product, missing source text).
    Skipped { reason: String },
    /// Unit failed with a trouble code.
    Failed { code: TroubleCode },
}

impl UnitOutcome {
    /// Run-item status column value for this outcome.
    pub fn item_status(&self) -> &'static str {
        match self {
            UnitOutcome::Applied => "updated",
            UnitOutcome::Unchanged | UnitOutcome::Preview => "ok",
            UnitOutcome::Skipped { .. } => "skipped",
            UnitOutcome::Failed { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_as_snake_case() {
        let json = serde_json::to_value(TroubleCode::PromptFailed).unwrap();
        assert_eq!(json, "prompt_failed");
        assert_eq!(TroubleCode::DbUnavailable.as_str(), "db_unavailable");
    }

    #[test]
    fn db_error_is_not_auto_retryable() {
        assert!(!TroubleCode::DbError.auto_retryable());
        assert!(TroubleCode::DbUnavailable.auto_retryable());
        assert!(TroubleCode::PromptFailed.auto_retryable());
    }

    #[test]
    fn item_status_mapping() {
        assert_eq!(UnitOutcome::Applied.item_status(), "updated");
        assert_eq!(UnitOutcome::Unchanged.item_status(), "ok");
        assert_eq!(
            UnitOutcome::Skipped {
                reason: "source_missing".into()
            }
            .item_status(),
            "skipped"
        );
        assert_eq!(
            UnitOutcome::Failed {
                code: TroubleCode::DbError
            }
            .item_status(),
            "error"
        );
    }
}
