use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::fallback::TokenUsage;
use crate::pipeline::preprocess::PreprocessorOutput;

/// Which path produced an `ExtractionResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Deterministic preprocessor output passed the coverage gate.
    Preprocessor,
    /// Generator response decoded into summary, rules and content.
    Llm,
    /// Terminal degraded result.
    Fallback,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preprocessor => "preprocessor",
            Self::Llm => "llm",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the deterministic path was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackReason {
    InsufficientCoverage { matched: usize, required: usize },
    PreprocessorFailed { reason: String },
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientCoverage { matched, required } => {
                write!(f, "insufficient coverage ({matched} of {required} required patterns)")
            }
            Self::PreprocessorFailed { reason } => write!(f, "preprocessor failed: {reason}"),
        }
    }
}

/// Outcome of the coverage gate.
#[derive(Debug, Clone)]
pub enum GateDecision {
    Accept(Box<PreprocessorOutput>),
    Fallback(FallbackReason),
}

/// Common result shape regardless of which path produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub method: ExtractionMethod,
    pub content: String,
    pub summary: String,
    pub validation_rules: Vec<String>,
    pub extracted_at: DateTime<Utc>,
    pub source_document: String,
    pub token_usage: TokenUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<PreprocessorOutput>,
}

/// `"3. CALL x()"` → `"CALL x()"`. Text without a leading step number is returned as is.
fn strip_step_number(step: &str) -> &str {
    let digits = step.len() - step.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return step;
    }
    step[digits..].strip_prefix(". ").unwrap_or(step)
}

impl ExtractionResult {
    /// Deterministic-path result: description as summary, logic-flow steps as
    /// rules (numbering removed, `to_prompt_context` renumbers), the full output
    /// as pretty JSON content.
    pub fn from_preprocessor(output: PreprocessorOutput, source_document: &str) -> Self {
        let content = serde_json::to_string_pretty(&output).unwrap_or_default();
        Self {
            method: ExtractionMethod::Preprocessor,
            content,
            summary: output.description.clone(),
            validation_rules: output
                .logic_flow
                .iter()
                .map(|step| strip_step_number(step).to_string())
                .collect(),
            extracted_at: Utc::now(),
            source_document: source_document.to_string(),
            token_usage: TokenUsage::default(),
            fallback_reason: None,
            preprocessor: Some(output),
        }
    }

    /// Render the block the downstream workflow generator injects into its template.
    pub fn to_prompt_context(&self) -> String {
        let rules = if self.validation_rules.is_empty() {
            "(none)".to_string()
        } else {
            self.validation_rules
                .iter()
                .enumerate()
                .map(|(i, rule)| format!("{}. {}", i + 1, rule))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "## Policy Summary\n{}\n\n## Validation Rules\n{}\n\n## Policy Details\n{}",
            self.summary, rules, self.content
        )
    }
}
