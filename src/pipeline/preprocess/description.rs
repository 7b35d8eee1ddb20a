use super::types::MatchedPattern;

/// Subject used when the document has no non-empty line.
const UNKNOWN_SUBJECT: &str = "Unknown Process";

/// Category used when no pattern matched.
const GENERIC_CATEGORY: &str = "Document";

/// Label prefixes stripped from the subject line (compared case-insensitively).
const LABEL_PREFIXES: &[&str] = &["policy:", "procedure:", "guidelines:", "정책:", "절차:"];

/// `issue_date` → `Issue Date`.
///
/// Underscores become spaces, then every ASCII letter or digit that starts a
/// word is upper-cased. Other characters are left as they are.
pub fn title_case_category(category: &str) -> String {
    let spaced = category.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    let mut prev_is_word = false;
    for c in spaced.chars() {
        let is_word = c.is_ascii_alphanumeric() || c == '_';
        if is_word && !prev_is_word {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        prev_is_word = is_word;
    }
    out
}

fn strip_heading_marker(line: &str) -> &str {
    if line.starts_with('#') {
        line.trim_start_matches('#').trim_start()
    } else {
        line
    }
}

fn strip_label_prefix(subject: &str) -> &str {
    for prefix in LABEL_PREFIXES {
        let len = prefix.len();
        let head = match subject.get(..len) {
            Some(head) => head,
            None => continue,
        };
        if head.to_lowercase() == *prefix {
            return subject[len..].trim();
        }
    }
    subject
}

/// The document subject: first non-empty line, heading marker and label prefix removed.
pub fn document_subject(text: &str) -> &str {
    match text.lines().map(str::trim).find(|line| !line.is_empty()) {
        Some(line) => strip_label_prefix(strip_heading_marker(line)),
        None => UNKNOWN_SUBJECT,
    }
}

/// `"<Category> verification for <subject>"`, using the first canonically sorted match.
pub fn build_description(text: &str, matched: &[MatchedPattern]) -> String {
    let category = matched
        .first()
        .map(|p| title_case_category(&p.category))
        .unwrap_or_else(|| GENERIC_CATEGORY.to_string());
    format!("{category} verification for {}", document_subject(text))
}
