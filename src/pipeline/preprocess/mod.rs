//! Deterministic policy preprocessor.
//!
//! raw text → normalize → match patterns → classify role / risk → principles
//! → description → checklist + logic flow → `PreprocessorOutput`
//!
//! Every stage is a pure function of the text and the registry, except the
//! metadata timestamp.

pub mod assemble;
pub mod classify;
pub mod description;
pub mod matcher;
pub mod principles;
pub mod types;

pub use assemble::*;
pub use classify::*;
pub use description::*;
pub use matcher::*;
pub use principles::*;
pub use types::*;

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::pipeline::registry::PatternRegistry;

/// Hex characters of the SHA-256 kept as the document fingerprint.
const FINGERPRINT_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("Pattern registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Pattern {pattern_id} keyword {keyword:?} cannot be compiled: {source}")]
    InvalidKeyword {
        pattern_id: String,
        keyword: String,
        #[source]
        source: regex::Error,
    },

    #[error("Preprocessor aborted: {0}")]
    Aborted(String),
}

/// Truncated SHA-256 of the raw text.
pub fn content_fingerprint(text: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(text.as_bytes()));
    digest[..FINGERPRINT_LEN].to_string()
}

/// Runs every deterministic stage against one registry.
///
/// Construction compiles the registry keywords once; `preprocess` can then be
/// called from any number of threads.
#[derive(Debug, Clone)]
pub struct PolicyPreprocessor {
    registry: Arc<PatternRegistry>,
    matcher: PatternMatcher,
}

impl PolicyPreprocessor {
    pub fn new(registry: Arc<PatternRegistry>) -> Result<Self, PreprocessError> {
        let matcher = PatternMatcher::compile(&registry)?;
        Ok(Self { registry, matcher })
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn preprocess(&self, text: &str) -> PreprocessorOutput {
        let normalized = normalize_text(text);

        let outcome = self.matcher.scan(&normalized);
        let selected_role = select_role(&normalized, &self.registry.role_mapping);
        let selected_risk_level =
            select_risk_level(&normalized, &self.registry.risk_level_mapping);
        let extracted_principles = extract_principles(text);
        let description = build_description(text, &outcome.matched);
        let assembly = assemble(&outcome.matched, &self.registry);

        tracing::debug!(
            matched = outcome.matched.len(),
            unmatched = outcome.unmatched.len(),
            role = %selected_role.role,
            risk_level = %selected_risk_level.level,
            "Preprocessing complete"
        );

        PreprocessorOutput {
            metadata: PreprocessorMetadata {
                registry_version: self.registry.version().to_string(),
                timestamp: Utc::now(),
                policy_hash: content_fingerprint(text),
            },
            matched_patterns: outcome.matched,
            unmatched_patterns: outcome.unmatched,
            selected_role,
            selected_risk_level,
            extracted_principles,
            description,
            checklist: assembly.checklist,
            logic_flow: assembly.logic_flow,
            critical_failures: assembly.critical_failures,
            review_triggers: assembly.review_triggers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::registry::{sample_registry, PatternRegistry};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn embedded_preprocessor() -> PolicyPreprocessor {
        PolicyPreprocessor::new(Arc::new(PatternRegistry::embedded().unwrap())).unwrap()
    }

    fn sample_preprocessor() -> PolicyPreprocessor {
        PolicyPreprocessor::new(Arc::new(sample_registry())).unwrap()
    }

    const POLICY: &str = "# Policy: Supplier Onboarding\n\
        All certificates must be issued within 30 days of submission.\n\
        A notarized copy of the business registration is required.\n\
        Applicants shall provide a passport or identity card.\n\
        The compliance team reviews suspected forgery.";

    #[test]
    fn full_preprocess_with_embedded_registry() {
        let output = embedded_preprocessor().preprocess(POLICY);

        assert_eq!(output.metadata.registry_version, "1.0.0");
        assert_eq!(output.metadata.policy_hash.len(), FINGERPRINT_LEN);

        let ids: Vec<&str> = output
            .matched_patterns
            .iter()
            .map(|p| p.pattern_id.as_str())
            .collect();
        // Prerequisites (PAT-001, PAT-002) first, ordered by priority then position.
        assert_eq!(ids[..2], ["PAT-001", "PAT-002"]);
        assert!(ids.contains(&"PAT-003"));
        assert!(ids.contains(&"PAT-004"));

        assert_eq!(output.selected_role.role, "Compliance Officer");
        assert_eq!(output.selected_risk_level.level, "high");
        assert_eq!(
            output.description,
            "Business Registration verification for Supplier Onboarding"
        );
        assert_eq!(
            output.extracted_principles[0],
            "All certificates must be issued within 30 days of submission"
        );
        assert_eq!(output.logic_flow.len(), output.matched_patterns.len() + 1);
        assert_eq!(output.checklist.len(), output.matched_patterns.len());
        assert!(output
            .critical_failures
            .contains(&"CRITICAL_FAIL_issue_date".to_string()));
        assert!(output
            .review_triggers
            .contains(&"REVIEW_notarization".to_string()));
    }

    #[test]
    fn short_policy_reaches_two_matches() {
        let output = embedded_preprocessor()
            .preprocess("Certificates issued within 30 days. A notarized copy required.");
        assert!(output.coverage() >= 2);
    }

    #[test]
    fn unrelated_text_matches_nothing() {
        let output = embedded_preprocessor()
            .preprocess("The weather was pleasant. Everyone enjoyed the picnic.");
        assert_eq!(output.coverage(), 0);
        assert!(output.selected_role.matched_via.is_default());
        assert_eq!(output.logic_flow.len(), 1);
    }

    #[test]
    fn idempotent_except_timestamp() {
        let pre = embedded_preprocessor();
        let mut first = pre.preprocess(POLICY);
        let second = pre.preprocess(POLICY);
        first.metadata.timestamp = second.metadata.timestamp;
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        assert_eq!(content_fingerprint("abc"), content_fingerprint("abc"));
        assert_ne!(content_fingerprint("abc"), content_fingerprint("abd"));
        assert_eq!(content_fingerprint("abc"), "ba7816bf8f01cfea");
    }

    #[test]
    fn empty_registry_is_trivial_not_fatal() {
        let pre = PolicyPreprocessor::new(Arc::new(PatternRegistry::empty())).unwrap();
        let output = pre.preprocess(POLICY);
        assert_eq!(output.coverage(), 0);
        assert!(output.unmatched_patterns.is_empty());
        assert_eq!(output.extracted_principles.len(), 3);
    }

    proptest! {
        #[test]
        fn matched_and_unmatched_partition_registry(text in "\\PC{0,300}") {
            let pre = sample_preprocessor();
            let output = pre.preprocess(&text);
            let matched: HashSet<&str> =
                output.matched_patterns.iter().map(|p| p.pattern_id.as_str()).collect();
            let unmatched: HashSet<&str> =
                output.unmatched_patterns.iter().map(|p| p.pattern_id.as_str()).collect();
            let all: HashSet<&str> = pre
                .registry()
                .pattern_definitions
                .iter()
                .map(|p| p.pattern_id.as_str())
                .collect();

            prop_assert!(matched.is_disjoint(&unmatched));
            prop_assert_eq!(matched.union(&unmatched).copied().collect::<HashSet<_>>(), all);
            prop_assert_eq!(
                output.matched_patterns.len() + output.unmatched_patterns.len(),
                pre.registry().pattern_definitions.len()
            );
        }

        #[test]
        fn canonical_order_and_flow_shape(words in proptest::collection::vec(
            prop_oneof![
                Just("notarized"), Just("business registration"), Just("issued within 12 days"),
                Just("seal"), Just("company seal"), Just("filler"), Just("text"),
            ], 0..20)) {
            let text = words.join(" ");
            let output = sample_preprocessor().preprocess(&text);

            let keys: Vec<(bool, u32, usize)> = output
                .matched_patterns
                .iter()
                .map(|p| (!p.is_prerequisite, p.priority, p.match_position))
                .collect();
            let mut sorted = keys.clone();
            sorted.sort();
            prop_assert_eq!(keys, sorted);

            prop_assert_eq!(output.logic_flow.len(), output.matched_patterns.len() + 1);
            let last = output.logic_flow.last().unwrap();
            prop_assert!(last.contains("AGGREGATE all results"));
            for (i, step) in output.logic_flow.iter().enumerate() {
                let prefix = format!("{}. ", i + 1);
                prop_assert!(step.starts_with(&prefix));
            }
        }

        #[test]
        fn classification_is_deterministic(text in "\\PC{0,200}") {
            let pre = sample_preprocessor();
            let a = pre.preprocess(&text);
            let b = pre.preprocess(&text);
            prop_assert_eq!(a.selected_role, b.selected_role);
            prop_assert_eq!(a.selected_risk_level, b.selected_risk_level);
            prop_assert_eq!(a.extracted_principles.len(), 3);
        }
    }
}
