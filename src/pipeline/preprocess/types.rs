use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::registry::{Criticality, PatternDefinition};

/// Priority reported for a classification that fell through to the table default.
pub const DEFAULT_PRIORITY: u32 = 999;

/// A registry pattern that fired, with where and how it fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPattern {
    pub pattern_id: String,
    pub category: String,
    pub priority: u32,
    pub criticality: Criticality,
    pub tool_id: String,
    pub matched_keyword: String,
    /// Character offset of the match in the normalized text.
    pub match_position: usize,
    pub source_type: String,
    pub is_prerequisite: bool,
}

impl MatchedPattern {
    pub fn new(pattern: &PatternDefinition, keyword: &str, position: usize) -> Self {
        Self {
            pattern_id: pattern.pattern_id.clone(),
            category: pattern.category.clone(),
            priority: pattern.priority,
            criticality: pattern.criticality,
            tool_id: pattern.tool_id.clone(),
            matched_keyword: keyword.to_string(),
            match_position: position,
            source_type: pattern.source_type.clone(),
            is_prerequisite: pattern.is_prerequisite,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedPattern {
    pub pattern_id: String,
    pub category: String,
}

/// Why a classification label was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedVia {
    /// This keyword was found in the text.
    Keyword(String),
    /// No table entry matched; the table default applies.
    Default,
}

impl MatchedVia {
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedRole {
    pub role: String,
    pub matched_via: MatchedVia,
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedRiskLevel {
    pub level: String,
    pub matched_via: MatchedVia,
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub data_point: String,
    pub source: String,
    pub tool: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessorMetadata {
    pub registry_version: String,
    pub timestamp: DateTime<Utc>,
    /// Truncated SHA-256 of the raw document text.
    pub policy_hash: String,
}

/// Everything the deterministic path knows about one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessorOutput {
    pub metadata: PreprocessorMetadata,
    /// Canonical order: prerequisites, then priority, then match position.
    pub matched_patterns: Vec<MatchedPattern>,
    pub unmatched_patterns: Vec<UnmatchedPattern>,
    pub selected_role: SelectedRole,
    pub selected_risk_level: SelectedRiskLevel,
    /// Always exactly three entries.
    pub extracted_principles: Vec<String>,
    pub description: String,
    pub checklist: Vec<ChecklistItem>,
    /// 1-indexed, the last entry is the aggregation step.
    pub logic_flow: Vec<String>,
    pub critical_failures: Vec<String>,
    pub review_triggers: Vec<String>,
}

impl PreprocessorOutput {
    pub fn coverage(&self) -> usize {
        self.matched_patterns.len()
    }
}
