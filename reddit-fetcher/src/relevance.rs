use revuai_core::FilterMode;

/// Decide whether `text` is topically relevant to `query`.
///
/// Pure and deterministic. Matching is case-insensitive substring work over
/// whitespace-split query terms:
///
/// - single-term query: plain substring match;
/// - strict mode: the exact phrase appears, or every term appears somewhere;
/// - relaxed mode: the exact phrase appears, or a strict majority of terms
///   (`n/2 + 1`) appear.
pub fn is_relevant(text: &str, query: &str, mode: FilterMode) -> bool {
    if text.is_empty() || query.is_empty() {
        return false;
    }

    let text_lower = text.to_lowercase();
    let query_lower = query.trim().to_lowercase();
    let terms: Vec<&str> = query_lower.split_whitespace().collect();

    match terms.len() {
        0 => false,
        1 => text_lower.contains(terms[0]),
        term_count => {
            if text_lower.contains(&query_lower) {
                return true;
            }
            let present = terms.iter().filter(|t| text_lower.contains(**t)).count();
            match mode {
                FilterMode::Strict => present == term_count,
                FilterMode::Relaxed => present >= term_count / 2 + 1,
            }
        }
    }
}
