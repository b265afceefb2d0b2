//! Multi-query variant generation for synthesis queries.
//!
//! Returns 1..=4 unique variants. Element 0 is always the verbatim original;
//! extra variants widen recall so every entity the query touches can surface
//! its own chunks. Non-synthesis queries pass through untouched.

const MAX_VARIANTS: usize = 4;

/// Leading command words stripped before an entity or subject is reused in a
/// generated variant.
const COMMAND_PREFIXES: &[&str] = &[
    "summarize",
    "summary of",
    "overview of",
    "compare",
    "describe",
    "list all",
    "list",
    "show all",
    "show",
    "give me",
    "all",
];

pub fn generate(query: &str, is_synthesis: bool) -> Vec<String> {
    let mut variants = vec![query.to_string()];
    if !is_synthesis {
        return variants;
    }

    let lower = query.to_lowercase();
    let entities = extract_entities(query);

    if is_comparison(&lower) && entities.len() == 2 {
        variants.push(format!("{} characteristics features", entities[0]));
        variants.push(format!("{} characteristics features", entities[1]));
        variants.push(format!("{} versus {} differences", entities[0], entities[1]));
    } else if entities.len() >= 2 {
        for entity in entities.iter().take(MAX_VARIANTS - 1) {
            variants.push(format!("{} summary overview", entity));
        }
    } else if is_aggregation(&lower) {
        let subject = strip_command_prefix(query);
        if !subject.is_empty() {
            variants.push(format!("{} list examples", subject));
            variants.push(format!("{} types categories", subject));
        }
    } else {
        let subject = strip_command_prefix(query);
        if !subject.is_empty() {
            variants.push(format!("{} overview", subject));
        }
    }

    dedupe_case_insensitive(variants)
}

fn is_comparison(lower: &str) -> bool {
    lower.contains("compare")
        || lower.contains("versus")
        || lower.contains(" vs ")
        || lower.contains("difference")
}

fn is_aggregation(lower: &str) -> bool {
    lower.contains("list all")
        || lower.contains("all ")
        || lower.contains("each ")
        || lower.contains("every ")
}

/// Split a query into its comma/and/versus-separated entities, with the
/// leading command word removed from the first one.
fn extract_entities(query: &str) -> Vec<String> {
    let trimmed = strip_command_prefix(query);
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut parts: Vec<String> = Vec::new();
    for (i, segment) in split_separators(&trimmed).into_iter().enumerate() {
        let mut entity = segment.trim().to_string();
        if i > 0 {
            entity = entity
                .strip_prefix("and ")
                .map(str::to_string)
                .unwrap_or(entity);
        }
        let entity = entity
            .trim_matches(|c: char| c == '?' || c == '.' || c == '!' || c == ',')
            .trim()
            .to_string();
        if !entity.is_empty() {
            parts.push(entity);
        }
    }
    if parts.len() < 2 {
        return Vec::new();
    }
    parts
}

/// Break on commas, then on " and " / " versus " / " vs " within segments.
fn split_separators(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for comma_part in text.split(',') {
        let mut rest = comma_part;
        loop {
            let lower = rest.to_ascii_lowercase();
            let sep = [" and ", " versus ", " vs "]
                .iter()
                .filter_map(|s| lower.find(s).map(|at| (at, s.len())))
                .min_by_key(|(at, _)| *at);
            match sep {
                Some((at, len)) => {
                    out.push(rest[..at].to_string());
                    rest = &rest[at + len..];
                }
                None => {
                    out.push(rest.to_string());
                    break;
                }
            }
        }
    }
    out
}

fn strip_command_prefix(query: &str) -> String {
    let trimmed = query.trim();
    let lower = trimmed.to_ascii_lowercase();
    for prefix in COMMAND_PREFIXES {
        let boundary = lower.as_bytes().get(prefix.len()).copied();
        if lower.starts_with(prefix) && boundary.map_or(true, |b| b == b' ') {
            let rest = trimmed[prefix.len()..].trim_start();
            return rest
                .trim_matches(|c: char| c == '?' || c == '.' || c == '!')
                .trim()
                .to_string();
        }
    }
    trimmed
        .trim_matches(|c: char| c == '?' || c == '.' || c == '!')
        .trim()
        .to_string()
}

fn dedupe_case_insensitive(variants: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for v in variants {
        if seen.insert(v.to_lowercase()) {
            out.push(v);
        }
        if out.len() == MAX_VARIANTS {
            break;
        }
    }
    out
}
