use super::description::title_case_category;
use super::types::{ChecklistItem, MatchedPattern};
use crate::pipeline::registry::{FailureSeverity, PatternRegistry};

/// Tool name reported when a pattern references a tool the registry does not define.
pub const UNKNOWN_TOOL: &str = "unknown";

/// Final logic-flow instruction, appended after the per-pattern checks.
const AGGREGATE_STEP: &str = "AGGREGATE all results → Proceed to Phase 3.";

/// Checklist, logic flow and failure labels derived from the matched patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
    pub checklist: Vec<ChecklistItem>,
    pub logic_flow: Vec<String>,
    pub critical_failures: Vec<String>,
    pub review_triggers: Vec<String>,
}

/// Walk the canonically ordered matches once and derive every downstream list.
pub fn assemble(matched: &[MatchedPattern], registry: &PatternRegistry) -> Assembly {
    let mut assembly = Assembly {
        logic_flow: Vec::with_capacity(matched.len() + 1),
        ..Assembly::default()
    };

    for (idx, pattern) in matched.iter().enumerate() {
        let tool = registry.tool(&pattern.tool_id);
        if tool.is_none() {
            tracing::debug!(
                pattern_id = %pattern.pattern_id,
                tool_id = %pattern.tool_id,
                "Pattern references an undefined tool"
            );
        }
        let tool_name = tool.map(|t| t.name.as_str()).unwrap_or(UNKNOWN_TOOL);
        let params = tool.map(|t| t.params.join(", ")).unwrap_or_default();

        assembly.checklist.push(ChecklistItem {
            data_point: title_case_category(&pattern.category),
            source: pattern.source_type.clone(),
            tool: tool_name.to_string(),
        });

        let severity = registry.decision_rules.severity_of(&pattern.pattern_id);
        let label = severity.label(&pattern.category);
        assembly.logic_flow.push(format!(
            "{}. CALL {tool_name}({params}) → IF valid, PROCEED. ELSE, FLAG as {label}.",
            idx + 1
        ));

        match severity {
            FailureSeverity::Critical => assembly.critical_failures.push(label),
            FailureSeverity::Review => assembly.review_triggers.push(label),
            FailureSeverity::Fail => {}
        }
    }

    assembly
        .logic_flow
        .push(format!("{}. {AGGREGATE_STEP}", matched.len() + 1));
    assembly
}
