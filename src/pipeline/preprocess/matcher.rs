use regex::Regex;

use super::types::{MatchedPattern, UnmatchedPattern};
use super::PreprocessError;
use crate::pipeline::registry::{PatternDefinition, PatternRegistry};

/// Marker inside a keyword standing for one-or-more digits.
const WILDCARD: char = '*';

/// Lower-case the text and collapse every whitespace run into one space.
///
/// Leading and trailing runs are collapsed too, not removed, so offsets stay
/// comparable with keyword positions computed on the same string.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push(' ');
                in_whitespace = true;
            }
        } else {
            in_whitespace = false;
            out.extend(c.to_lowercase());
        }
    }
    out
}

/// A keyword ready to search for.
#[derive(Debug, Clone)]
enum KeywordMatcher {
    Literal(String),
    Wildcard(Regex),
}

impl KeywordMatcher {
    fn compile(keyword: &str) -> Result<Self, regex::Error> {
        let normalized = normalize_text(keyword);
        if normalized.contains(WILDCARD) {
            let escaped = regex::escape(&normalized);
            let pattern = escaped.replace(r"\*", "[0-9]+");
            Ok(Self::Wildcard(Regex::new(&pattern)?))
        } else {
            Ok(Self::Literal(normalized))
        }
    }

    /// Byte offset of the first occurrence.
    fn find(&self, haystack: &str) -> Option<usize> {
        match self {
            Self::Literal(needle) => haystack.find(needle.as_str()),
            Self::Wildcard(regex) => regex.find(haystack).map(|m| m.start()),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledPattern {
    definition: PatternDefinition,
    keywords: Vec<(String, KeywordMatcher)>,
}

/// Result of scanning one document: every registry pattern lands in exactly one list.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub matched: Vec<MatchedPattern>,
    pub unmatched: Vec<UnmatchedPattern>,
}

/// Registry patterns compiled once, scanned per document.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    patterns: Vec<CompiledPattern>,
}

impl PatternMatcher {
    pub fn compile(registry: &PatternRegistry) -> Result<Self, PreprocessError> {
        let mut patterns = Vec::with_capacity(registry.pattern_definitions.len());
        for definition in registry.patterns_by_id() {
            let mut keywords = Vec::with_capacity(definition.keywords.len());
            for keyword in &definition.keywords {
                if keyword.trim().is_empty() {
                    continue;
                }
                let matcher = KeywordMatcher::compile(keyword).map_err(|source| {
                    PreprocessError::InvalidKeyword {
                        pattern_id: definition.pattern_id.clone(),
                        keyword: keyword.clone(),
                        source,
                    }
                })?;
                keywords.push((keyword.clone(), matcher));
            }
            patterns.push(CompiledPattern {
                definition: definition.clone(),
                keywords,
            });
        }
        Ok(Self { patterns })
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Scan normalized text. The first keyword in list order that occurs wins,
    /// even when a later keyword would occur earlier in the text.
    pub fn scan(&self, normalized: &str) -> MatchOutcome {
        let mut outcome = MatchOutcome::default();

        for pattern in &self.patterns {
            let hit = pattern
                .keywords
                .iter()
                .find_map(|(keyword, matcher)| matcher.find(normalized).map(|at| (keyword, at)));

            match hit {
                Some((keyword, byte_offset)) => {
                    let position = normalized[..byte_offset].chars().count();
                    tracing::debug!(
                        pattern_id = %pattern.definition.pattern_id,
                        criticality = pattern.definition.criticality.as_str(),
                        keyword = %keyword,
                        position,
                        "Pattern matched"
                    );
                    outcome
                        .matched
                        .push(MatchedPattern::new(&pattern.definition, keyword, position));
                }
                None => outcome.unmatched.push(UnmatchedPattern {
                    pattern_id: pattern.definition.pattern_id.clone(),
                    category: pattern.definition.category.clone(),
                }),
            }
        }

        sort_canonical(&mut outcome.matched);
        outcome
    }
}

/// Prerequisites first, then ascending priority, then ascending match position.
pub fn sort_canonical(matched: &mut [MatchedPattern]) {
    matched.sort_by_key(|p| (!p.is_prerequisite, p.priority, p.match_position));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::registry::sample_registry;

    fn scan(text: &str) -> MatchOutcome {
        let matcher = PatternMatcher::compile(&sample_registry()).unwrap();
        matcher.scan(&normalize_text(text))
    }

    fn matched_ids(outcome: &MatchOutcome) -> Vec<&str> {
        outcome.matched.iter().map(|p| p.pattern_id.as_str()).collect()
    }

    #[test]
    fn normalize_lowercases_and_collapses() {
        assert_eq!(normalize_text("  Issued\t\tWITHIN\n\n30 Days "), " issued within 30 days ");
    }

    #[test]
    fn normalize_handles_unicode_whitespace() {
        assert_eq!(normalize_text("a\u{3000}\u{00A0}b"), "a b");
    }

    #[test]
    fn wildcard_accepts_digits() {
        let matcher = KeywordMatcher::compile("valid for * days").unwrap();
        assert_eq!(matcher.find("this is valid for 45 days only"), Some(8));
    }

    #[test]
    fn wildcard_requires_at_least_one_digit() {
        let matcher = KeywordMatcher::compile("valid for * days").unwrap();
        assert_eq!(matcher.find("valid for days"), None);
        assert_eq!(matcher.find("valid for many days"), None);
    }

    #[test]
    fn wildcard_escapes_other_metacharacters() {
        let matcher = KeywordMatcher::compile("fee (usd *)").unwrap();
        assert!(matcher.find("a fee (usd 20) applies").is_some());
        assert!(matcher.find("a fee usd 20 applies").is_none());
    }

    #[test]
    fn first_keyword_in_list_order_wins() {
        // "issued within" appears earlier, but the wildcard keyword is listed first.
        let outcome = scan("Copies issued within the quarter; originals issued within 30 days.");
        let issue = outcome
            .matched
            .iter()
            .find(|p| p.pattern_id == "P-001")
            .unwrap();
        assert_eq!(issue.matched_keyword, "issued within * days");
        assert!(issue.match_position > 20);
    }

    #[test]
    fn falls_through_to_later_keyword() {
        let outcome = scan("Certificates issued within the current month.");
        let issue = outcome
            .matched
            .iter()
            .find(|p| p.pattern_id == "P-001")
            .unwrap();
        assert_eq!(issue.matched_keyword, "issued within");
    }

    #[test]
    fn matched_and_unmatched_partition_registry() {
        let outcome = scan("A notarized copy is required.");
        assert_eq!(matched_ids(&outcome), vec!["P-003"]);
        let unmatched: Vec<&str> = outcome
            .unmatched
            .iter()
            .map(|p| p.pattern_id.as_str())
            .collect();
        assert_eq!(unmatched, vec!["P-001", "P-002", "P-004"]);
    }

    #[test]
    fn canonical_order_prerequisite_then_priority_then_position() {
        let text = "Seal required. A notarized copy issued within 30 days and the \
                    business registration certificate.";
        let outcome = scan(text);
        // P-002 prerequisite first; P-003/P-001 share priority 2 and sort by position;
        // P-004 has priority 3.
        assert_eq!(matched_ids(&outcome), vec!["P-002", "P-003", "P-001", "P-004"]);
    }

    #[test]
    fn position_is_in_characters() {
        let outcome = scan("서류는 notarized 사본");
        let notary = &outcome.matched[0];
        assert_eq!(notary.match_position, 4);
    }

    #[test]
    fn no_matches_is_not_an_error() {
        let outcome = scan("Nothing relevant here at all.");
        assert!(outcome.matched.is_empty());
        assert_eq!(outcome.unmatched.len(), 4);
    }

    #[test]
    fn empty_registry_yields_empty_outcome() {
        let matcher = PatternMatcher::compile(&PatternRegistry::empty()).unwrap();
        let outcome = matcher.scan("issued within 30 days");
        assert!(outcome.matched.is_empty());
        assert!(outcome.unmatched.is_empty());
    }
}
