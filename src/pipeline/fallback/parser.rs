use serde::Deserialize;

use super::GeneratorError;

/// Summary used when the generator response cannot be decoded.
pub const DEGRADED_SUMMARY: &str = "Policy document analyzed";

/// The structured triple a generator is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedExtraction {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub validation_rules: Vec<String>,
    #[serde(default)]
    pub structured_content: Option<String>,
}

/// Strip an optional ```json / ``` opening fence and a trailing ``` fence.
fn strip_code_fence(response: &str) -> &str {
    let mut body = response.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Decode a generator response into the structured triple.
pub fn parse_generated_extraction(response: &str) -> Result<GeneratedExtraction, GeneratorError> {
    let json = strip_code_fence(response);
    if json.is_empty() {
        return Err(GeneratorError::ResponseParsing("Empty response".into()));
    }
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| GeneratorError::ResponseParsing(e.to_string()))?;
    if !value.is_object() {
        return Err(GeneratorError::ResponseParsing(
            "Expected a JSON object".into(),
        ));
    }
    serde_json::from_value(value).map_err(|e| GeneratorError::ResponseParsing(e.to_string()))
}
