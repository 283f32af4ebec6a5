//! Wire types for the generation endpoint.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use lexiport_core::instruction::PromptInstruction;
use lexiport_core::types::LangId;

/// Request body posted to the generation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PromptRequest {
    /// Correlation id echoed in logs on both sides.
    pub request_id: String,
    /// Identity of the stored prompt template the endpoint should use.
    pub prompt_id: String,
    #[serde(flatten)]
    pub instruction: PromptInstruction,
}

impl PromptRequest {
    pub fn new(prompt_id: &str, instruction: PromptInstruction) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            prompt_id: prompt_id.to_string(),
            instruction,
        }
    }
}

/// Response document: per-language field values, keyed by the target
/// language id rendered as a string (JSON object keys are strings).
#[derive(Debug, Clone, Deserialize)]
pub struct PromptOutput {
    pub outputs: BTreeMap<String, BTreeMap<String, String>>,
}

impl PromptOutput {
    /// The generated document for one target language, if present.
    pub fn for_lang(&self, lang_id: LangId) -> Option<&BTreeMap<String, String>> {
        self.outputs.get(&lang_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_flattens_instruction() {
        let instruction = PromptInstruction::build(
            10,
            1,
            &[2],
            &["name".to_string()],
            &[("name".to_string(), "Chair".to_string())]
                .into_iter()
                .collect(),
        );
        let request = PromptRequest::new("catalog-v2", instruction);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["prompt_id"], "catalog-v2");
        assert_eq!(value["product_id"], 10);
        assert_eq!(value["lang_to"], serde_json::json!([2]));
        assert_eq!(value["source"]["name"], "Chair");
        assert!(value["request_id"].is_string());
    }

    #[test]
    fn output_lookup_by_lang() {
        let output: PromptOutput = serde_json::from_value(serde_json::json!({
            "outputs": {
                "2": { "name": "Stuhl" },
                "3": { "name": "Chaise" }
            }
        }))
        .unwrap();

        assert_eq!(output.for_lang(2).unwrap()["name"], "Stuhl");
        assert_eq!(output.for_lang(3).unwrap()["name"], "Chaise");
        assert!(output.for_lang(4).is_none());
    }
}
