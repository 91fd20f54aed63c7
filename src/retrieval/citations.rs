//! Citation rendering for grounded answers.

use std::collections::HashSet;

use crate::stores::SearchResult;

/// Appends a `Sources:` section to `answer`, listing each distinct source
/// once in first-seen order.
///
/// A context's source is its metadata `source` label, falling back to its
/// URL. With no contexts the answer is returned unchanged.
pub fn render_with_citations(answer: &str, contexts: &[SearchResult]) -> String {
    if contexts.is_empty() {
        return answer.to_string();
    }

    let mut lines = vec![answer.to_string(), String::new(), "Sources:".to_string()];
    let mut seen = HashSet::new();
    for context in contexts {
        let source = context
            .metadata
            .get("source")
            .and_then(|value| value.as_str())
            .filter(|value| !value.is_empty())
            .unwrap_or(&context.url);
        if source.is_empty() || !seen.insert(source.to_string()) {
            continue;
        }
        lines.push(format!("- {source}"));
    }
    lines.join("\n")
}
