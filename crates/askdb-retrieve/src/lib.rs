//! askdb-retrieve
//!
//! The retrieval half of the pipeline: per-collection hybrid (lexical +
//! dense) search with score fusion across query variants, bounded parallel
//! fan-out over collections, cross-encoder reranking with a fused-order
//! fallback, and context-window assembly.

pub mod context;
pub mod hybrid;
pub mod rerank;
pub mod router;

pub use context::{assemble, AssembledContext};
pub use hybrid::HybridRetriever;
pub use rerank::Reranker;
pub use router::{resolve_targets, CollectionRouter, FanOutOutcome};
