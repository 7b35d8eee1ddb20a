use std::collections::HashSet;

/// Number of principles every extraction reports.
pub const PRINCIPLE_COUNT: usize = 3;

/// Candidate sentences must be longer than this (characters, after trimming).
const MIN_SENTENCE_CHARS: usize = 10;

/// Cue terms in search order, English then Korean.
const CUE_TERMS: &[&str] = &["must", "shall", "required", "해야 한다", "필요", "필수"];

/// Filler used when the document yields fewer than three principles.
/// Slot `n` is filled with `DEFAULT_PRINCIPLES[n]`.
const DEFAULT_PRINCIPLES: [&str; PRINCIPLE_COUNT] = [
    "Accuracy in data extraction",
    "Completeness of verification",
    "Timeliness of processing",
];

fn is_sentence_break(c: char) -> bool {
    matches!(c, '.' | '。' | '\n')
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate<'a> {
    text: &'a str,
    lowered: String,
    /// Byte offset of the trimmed sentence in the original text.
    position: usize,
}

fn push_candidate<'a>(candidates: &mut Vec<Candidate<'a>>, text: &'a str, start: usize, end: usize) {
    let segment = &text[start..end];
    let trimmed = segment.trim();
    if trimmed.chars().count() > MIN_SENTENCE_CHARS {
        let leading = segment.len() - segment.trim_start().len();
        candidates.push(Candidate {
            text: trimmed,
            lowered: trimmed.to_lowercase(),
            position: start + leading,
        });
    }
}

/// Split on sentence punctuation or newline, keeping sentences long enough to
/// carry a rule. Returned in document order.
fn candidate_sentences(text: &str) -> Vec<Candidate<'_>> {
    let mut candidates = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if is_sentence_break(c) {
            push_candidate(&mut candidates, text, start, i);
            start = i + c.len_utf8();
        }
    }
    push_candidate(&mut candidates, text, start, text.len());
    candidates
}

/// Extract exactly three guiding principles from the original (non-normalized) text.
///
/// For each cue term in order, the earliest unused sentence containing it is
/// taken. Missing slots are padded from `DEFAULT_PRINCIPLES`.
pub fn extract_principles(text: &str) -> Vec<String> {
    let candidates = candidate_sentences(text);
    let mut used: HashSet<usize> = HashSet::new();
    let mut principles: Vec<String> = Vec::with_capacity(PRINCIPLE_COUNT);

    for term in CUE_TERMS {
        if principles.len() >= PRINCIPLE_COUNT {
            break;
        }
        let term = term.to_lowercase();
        let earliest = candidates
            .iter()
            .filter(|c| !used.contains(&c.position) && c.lowered.contains(term.as_str()))
            .min_by_key(|c| c.position);

        if let Some(sentence) = earliest {
            principles.push(sentence.text.to_string());
            used.insert(sentence.position);
        }
    }

    while principles.len() < PRINCIPLE_COUNT {
        principles.push(DEFAULT_PRINCIPLES[principles.len()].to_string());
    }
    principles
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_text_gets_all_defaults() {
        assert_eq!(extract_principles(""), DEFAULT_PRINCIPLES.to_vec());
    }

    #[test]
    fn one_principle_pads_remaining_slots_in_order() {
        let principles = extract_principles("Applicants must attach a recent photograph.");
        assert_eq!(
            principles,
            vec![
                "Applicants must attach a recent photograph",
                "Completeness of verification",
                "Timeliness of processing",
            ]
        );
    }

    #[test]
    fn cue_terms_processed_in_order() {
        let text = "The notary shall stamp every page.\n\
                    Applicants must sign the form.\n\
                    A translation is required for foreign documents.";
        let principles = extract_principles(text);
        assert_eq!(
            principles,
            vec![
                "Applicants must sign the form",
                "The notary shall stamp every page",
                "A translation is required for foreign documents",
            ]
        );
    }

    #[test]
    fn sentence_used_once_across_cue_terms() {
        // The first sentence contains both "must" and "shall"; "shall" has to move on.
        let text = "Staff must and shall verify seals. Reviewers shall log results. \
                    Nothing else here at all.";
        let principles = extract_principles(text);
        assert_eq!(principles[0], "Staff must and shall verify seals");
        assert_eq!(principles[1], "Reviewers shall log results");
        assert_eq!(principles[2], "Timeliness of processing");
    }

    #[test]
    fn earliest_sentence_wins_for_a_term() {
        let text = "Second rule: forms must be typed. First? No. Copies must be certified.";
        let principles = extract_principles(text);
        assert_eq!(principles[0], "Second rule: forms must be typed");
    }

    #[test]
    fn short_sentences_discarded() {
        // "Must sign" is 9 characters, "You must!!" is 10: both too short.
        let principles = extract_principles("Must sign.\nYou must!!");
        assert_eq!(principles, DEFAULT_PRINCIPLES.to_vec());
    }

    #[test]
    fn korean_cues_and_full_stop() {
        let text = "모든 서류는 원본이어야 하며 공증이 필요합니다。신청서는 반드시 제출해야 한다";
        let principles = extract_principles(text);
        assert_eq!(principles[0], "신청서는 반드시 제출해야 한다");
        assert_eq!(principles[1], "모든 서류는 원본이어야 하며 공증이 필요합니다");
    }

    #[test]
    fn match_is_case_insensitive() {
        let principles = extract_principles("ALL COPIES MUST BE NOTARIZED.");
        assert_eq!(principles[0], "ALL COPIES MUST BE NOTARIZED");
    }

    #[test]
    fn deterministic() {
        let text = "Files must be scanned. Reviewers shall confirm. Seals are required here.";
        assert_eq!(extract_principles(text), extract_principles(text));
    }

    proptest! {
        #[test]
        fn always_exactly_three(text in "\\PC{0,400}") {
            prop_assert_eq!(extract_principles(&text).len(), PRINCIPLE_COUNT);
        }

        #[test]
        fn always_three_with_cue_heavy_text(words in proptest::collection::vec(
            prop_oneof![Just("must"), Just("shall"), Just("required"), Just("필요"),
                        Just("."), Just("\n"), Just("documents"), Just("the")], 0..60)) {
            let text = words.join(" ");
            let principles = extract_principles(&text);
            prop_assert_eq!(principles.len(), PRINCIPLE_COUNT);
            prop_assert!(principles.iter().all(|p| !p.is_empty()));
        }
    }
}
