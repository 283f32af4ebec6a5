//! Translatable product field catalog: length ceilings, HTML markers, safe
//! fallbacks, and output validation.
//!
//! Column limits match the destination catalog schema. Values over the limit
//! are truncated (on a char boundary) after whitespace collapsing, so an
//! applied value never exceeds its ceiling regardless of what the generation
//! endpoint returned.

use std::collections::BTreeMap;

/// The product title field. Source of slug derivation.
pub const FIELD_NAME: &str = "name";

/// The URL-safe slug column in the destination catalog.
pub const FIELD_LINK_REWRITE: &str = "link_rewrite";

/// Destination column ceilings, in characters. Fields absent here
/// (`description`, `description_short`) are unbounded TEXT columns.
const LENGTH_CEILINGS: &[(&str, usize)] = &[
    (FIELD_NAME, 128),
    ("meta_title", 255),
    ("meta_description", 512),
    (FIELD_LINK_REWRITE, 128),
];

/// Fields whose values carry HTML markup. The prompt instruction marks these
/// so structure-preserving translation is requested only where needed.
const HTML_FIELDS: &[&str] = &["description", "description_short"];

/// Fields for which a missing or empty generated value may be substituted
/// with the source text verbatim instead of failing the unit.
///
/// Kept deliberately small: substituting the source for `name` or
/// `description` would silently ship untranslated content.
const FALLBACK_FIELDS: &[&str] = &["meta_title", "meta_description"];

/// Return the length ceiling for a field, if one is configured.
pub fn length_ceiling(field: &str) -> Option<usize> {
    LENGTH_CEILINGS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, max)| *max)
}

/// Whether a field's value carries HTML markup.
pub fn is_html_field(field: &str) -> bool {
    HTML_FIELDS.contains(&field)
}

/// Whether the source text may stand in for a missing generated value.
pub fn has_safe_fallback(field: &str) -> bool {
    FALLBACK_FIELDS.contains(&field)
}

/// Collapse runs of whitespace into single spaces and trim the ends.
///
/// HTML fields are exempt: collapsing whitespace inside markup can change
/// rendering (e.g. inside `<pre>`).
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate a string to at most `max` characters on a char boundary.
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Normalize one generated field value for application to the catalog:
/// collapse whitespace (non-HTML fields only), then enforce the ceiling.
pub fn normalize_value(field: &str, value: &str) -> String {
    let collapsed = if is_html_field(field) {
        value.trim().to_string()
    } else {
        collapse_whitespace(value)
    };
    match length_ceiling(field) {
        Some(max) => truncate_chars(&collapsed, max),
        None => collapsed,
    }
}

/// Outcome of validating one language's generated output.
#[derive(Debug, PartialEq, Eq)]
pub enum Validation {
    /// All requested fields present (possibly via fallback substitution).
    /// Holds the normalized field values ready for application.
    Ok(BTreeMap<String, String>),
    /// One or more requested fields missing with no safe fallback.
    MissingFields(Vec<String>),
}

/// Validate a generated output document against the requested field list.
///
/// Every requested field must be present and non-empty. For fields with a
/// safe fallback the source value is substituted before the check, so a
/// generation omission there does not discard the whole unit. Values that
/// pass are normalized (whitespace + ceilings).
pub fn validate_output(
    requested: &[String],
    generated: &BTreeMap<String, String>,
    source: &BTreeMap<String, String>,
) -> Validation {
    let mut missing = Vec::new();
    let mut values = BTreeMap::new();

    for field in requested {
        let generated_value = generated
            .get(field)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty());

        let value = match generated_value {
            Some(v) => Some(v),
            None if has_safe_fallback(field) => source
                .get(field)
                .map(String::as_str)
                .filter(|v| !v.trim().is_empty()),
            None => None,
        };

        match value {
            Some(v) => {
                values.insert(field.clone(), normalize_value(field, v));
            }
            None => missing.push(field.clone()),
        }
    }

    if missing.is_empty() {
        Validation::Ok(values)
    } else {
        Validation::MissingFields(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn requested(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn collapse_whitespace_flattens_runs() {
        assert_eq!(collapse_whitespace("  a\t b\n\nc  "), "a b c");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }

    #[test]
    fn normalize_enforces_ceiling_even_for_oversized_input() {
        let long = "x".repeat(4000);
        let normalized = normalize_value("name", &long);
        assert_eq!(normalized.chars().count(), 128);
    }

    #[test]
    fn normalize_leaves_unbounded_fields_alone() {
        let long = "y".repeat(4000);
        assert_eq!(normalize_value("description", &long).len(), 4000);
    }

    #[test]
    fn html_fields_keep_inner_whitespace() {
        let value = " <p>a  b</p> ";
        assert_eq!(normalize_value("description", value), "<p>a  b</p>");
    }

    #[test]
    fn missing_field_without_fallback_is_rejected() {
        let result = validate_output(
            &requested(&["name", "description"]),
            &map(&[("name", "Stuhl")]),
            &map(&[("name", "Chair"), ("description", "A chair")]),
        );
        assert_eq!(
            result,
            Validation::MissingFields(vec!["description".to_string()])
        );
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let result = validate_output(
            &requested(&["name"]),
            &map(&[("name", "   ")]),
            &map(&[("name", "Chair")]),
        );
        assert_eq!(result, Validation::MissingFields(vec!["name".to_string()]));
    }

    #[test]
    fn fallback_substitutes_source_text() {
        let result = validate_output(
            &requested(&["name", "meta_title"]),
            &map(&[("name", "Stuhl")]),
            &map(&[("name", "Chair"), ("meta_title", "Chair | Shop")]),
        );
        match result {
            Validation::Ok(values) => {
                assert_eq!(values["meta_title"], "Chair | Shop");
                assert_eq!(values["name"], "Stuhl");
            }
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[test]
    fn fallback_with_empty_source_still_fails() {
        let result = validate_output(
            &requested(&["meta_title"]),
            &map(&[]),
            &map(&[("meta_title", "")]),
        );
        assert_eq!(
            result,
            Validation::MissingFields(vec!["meta_title".to_string()])
        );
    }
}
