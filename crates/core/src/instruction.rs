//! Structured instruction assembly for the text-generation endpoint.
//!
//! The instruction names the source language, the target language(s), and
//! the exact fields to produce, marking HTML-bearing fields so structure
//! preservation is requested only where needed. Whether a single call covers
//! all target languages or one language at a time is the caller's decision
//! (sequential mode is forced when more than one language is requested).

use serde::Serialize;
use std::collections::BTreeMap;

use crate::fields::is_html_field;
use crate::types::{LangId, ProductId};

/// One field the generation endpoint must produce.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    /// The value carries HTML; translation must preserve markup structure.
    pub html: bool,
}

/// A fully-assembled generation instruction for one product.
#[derive(Debug, Clone, Serialize)]
pub struct PromptInstruction {
    pub product_id: ProductId,
    pub lang_from: LangId,
    pub lang_to: Vec<LangId>,
    pub fields: Vec<FieldSpec>,
    /// Source-language field values, keyed by field name.
    pub source: BTreeMap<String, String>,
}

impl PromptInstruction {
    /// Assemble an instruction from the requested field list and the source
    /// values fetched from the catalog. Fields with no source value are
    /// still listed: the endpoint is told what to produce, validation later
    /// decides whether the result is acceptable.
    pub fn build(
        product_id: ProductId,
        lang_from: LangId,
        lang_to: &[LangId],
        requested: &[String],
        source: &BTreeMap<String, String>,
    ) -> Self {
        let fields = requested
            .iter()
            .map(|name| FieldSpec {
                name: name.clone(),
                html: is_html_field(name),
            })
            .collect();

        Self {
            product_id,
            lang_from,
            lang_to: lang_to.to_vec(),
            fields,
            source: source.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> BTreeMap<String, String> {
        [
            ("name".to_string(), "Chair".to_string()),
            ("description".to_string(), "<p>Oak.</p>".to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn html_fields_are_marked() {
        let instruction = PromptInstruction::build(
            10,
            1,
            &[2],
            &["name".to_string(), "description".to_string()],
            &source(),
        );
        assert_eq!(
            instruction.fields,
            vec![
                FieldSpec {
                    name: "name".into(),
                    html: false
                },
                FieldSpec {
                    name: "description".into(),
                    html: true
                },
            ]
        );
    }

    #[test]
    fn fields_without_source_values_are_still_listed() {
        let instruction =
            PromptInstruction::build(10, 1, &[2, 3], &["meta_title".to_string()], &source());
        assert_eq!(instruction.fields.len(), 1);
        assert_eq!(instruction.lang_to, vec![2, 3]);
        assert!(!instruction.source.contains_key("meta_title"));
    }
}
