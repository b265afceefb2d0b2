//! askdb-lexical
//!
//! Tantivy-backed `LexicalIndex` adapter. Each collection is an index
//! directory under a shared root; queries run through a lowercasing +
//! stop-word analyzer and return BM25 scores.

pub mod analyzer;
pub mod search;
pub mod writer;

pub use search::TantivyLexicalIndex;
pub use writer::CollectionWriter;
