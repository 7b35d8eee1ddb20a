use super::matcher::normalize_text;
use super::types::{MatchedVia, SelectedRiskLevel, SelectedRole, DEFAULT_PRIORITY};
use crate::pipeline::registry::{RiskLevelMapping, RoleMapping};

/// A classification hit: table index plus the keyword that selected it.
struct TableHit<'a> {
    index: usize,
    keyword: &'a str,
}

/// Scan entries in ascending priority; the first keyword found anywhere in the
/// text selects its entry and ends the scan. Equal priorities keep table order.
fn first_hit<'a, E>(
    normalized: &str,
    entries: &'a [E],
    priority: impl Fn(&E) -> u32,
    keywords: impl Fn(&'a E) -> &'a [String],
) -> Option<TableHit<'a>> {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by_key(|&i| priority(&entries[i]));

    for index in order {
        for keyword in keywords(&entries[index]) {
            let needle = normalize_text(keyword);
            if needle.trim().is_empty() {
                continue;
            }
            if normalized.contains(needle.as_str()) {
                return Some(TableHit { index, keyword });
            }
        }
    }
    None
}

/// Pick the role for a document. Never fails: the table default applies when nothing matches.
pub fn select_role(normalized: &str, mapping: &RoleMapping) -> SelectedRole {
    match first_hit(
        normalized,
        &mapping.priority_order,
        |e| e.priority,
        |e| e.keywords.as_slice(),
    ) {
        Some(hit) => {
            let entry = &mapping.priority_order[hit.index];
            SelectedRole {
                role: entry.role.clone(),
                matched_via: MatchedVia::Keyword(hit.keyword.to_string()),
                priority: entry.priority,
            }
        }
        None => SelectedRole {
            role: mapping.default_role.clone(),
            matched_via: MatchedVia::Default,
            priority: DEFAULT_PRIORITY,
        },
    }
}

/// Pick the risk level for a document, independently of the role.
pub fn select_risk_level(normalized: &str, mapping: &RiskLevelMapping) -> SelectedRiskLevel {
    match first_hit(
        normalized,
        &mapping.priority_order,
        |e| e.priority,
        |e| e.keywords.as_slice(),
    ) {
        Some(hit) => {
            let entry = &mapping.priority_order[hit.index];
            SelectedRiskLevel {
                level: entry.level.clone(),
                matched_via: MatchedVia::Keyword(hit.keyword.to_string()),
                priority: entry.priority,
            }
        }
        None => SelectedRiskLevel {
            level: mapping.default_level.clone(),
            matched_via: MatchedVia::Default,
            priority: DEFAULT_PRIORITY,
        },
    }
}
