//! Synthesis-query detection.
//!
//! A synthesis query is one whose answer requires evidence from multiple
//! distinct source documents. Detection is keyword + shape heuristics; every
//! fired heuristic is reported as a `Signal` so callers can audit the
//! decision.

const SUMMARIZATION_KEYWORDS: &[&str] = &["summarize", "summary", "overview"];
const COMPARISON_KEYWORDS: &[&str] = &["compare", "versus", " vs ", "difference"];
const AGGREGATION_KEYWORDS: &[&str] = &["list all", "all ", "each ", "every "];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Summarization(&'static str),
    Comparison(&'static str),
    Aggregation(&'static str),
    /// Query lists N comma-separated items.
    CommaSeparatedItems(usize),
    /// " and " joins two proper-noun-like tokens.
    ConjoinedProperNouns,
    /// Query mentions N distinct capitalized tokens.
    CapitalizedTokens(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_synthesis: bool,
    pub signals: Vec<Signal>,
}

/// Classify a raw query. Pure function, no side effects.
pub fn classify(query: &str) -> Classification {
    let lower = query.to_lowercase();
    let mut signals = Vec::new();

    for &kw in SUMMARIZATION_KEYWORDS {
        if lower.contains(kw) {
            signals.push(Signal::Summarization(kw));
        }
    }
    for &kw in COMPARISON_KEYWORDS {
        if lower.contains(kw) {
            signals.push(Signal::Comparison(kw));
        }
    }
    for &kw in AGGREGATION_KEYWORDS {
        if lower.contains(kw) {
            signals.push(Signal::Aggregation(kw));
        }
    }

    let comma_items = query
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .count();
    if comma_items >= 2 {
        signals.push(Signal::CommaSeparatedItems(comma_items));
    }

    if has_conjoined_proper_nouns(query) {
        signals.push(Signal::ConjoinedProperNouns);
    }

    let capitalized = distinct_capitalized_tokens(query);
    if capitalized >= 3 {
        signals.push(Signal::CapitalizedTokens(capitalized));
    }

    Classification { is_synthesis: !signals.is_empty(), signals }
}

/// True when " and " joins two tokens that both start with an uppercase
/// letter, e.g. "Paris and London".
fn has_conjoined_proper_nouns(query: &str) -> bool {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    for window in tokens.windows(3) {
        if window[1].eq_ignore_ascii_case("and")
            && starts_uppercase(window[0])
            && starts_uppercase(window[2])
        {
            return true;
        }
    }
    false
}

fn distinct_capitalized_tokens(query: &str) -> usize {
    let mut seen = std::collections::HashSet::new();
    for token in query.split_whitespace() {
        let cleaned = token.trim_matches(|c: char| !c.is_alphanumeric());
        if cleaned.len() > 1 && starts_uppercase(cleaned) {
            seen.insert(cleaned.to_lowercase());
        }
    }
    seen.len()
}

fn starts_uppercase(token: &str) -> bool {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .chars()
        .next()
        .is_some_and(|c| c.is_uppercase())
}
