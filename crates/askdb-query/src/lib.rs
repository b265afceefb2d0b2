//! askdb-query
//!
//! Query-side text analysis: synthesis classification and multi-query variant
//! generation. Pure string functions with no collaborator access, so the
//! heuristics can be swapped out without touching retrieval.

pub mod classify;
pub mod variants;

pub use classify::{classify, Classification, Signal};
pub use variants::generate;

/// Canonical form used for exact-cache keys and variant dedupe: trimmed,
/// lowercased, inner whitespace collapsed.
pub fn normalize_query(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
