//! askdb-pipeline
//!
//! End-to-end query orchestration: cache check, classification, variant
//! generation, fan-out retrieval, reranking, and context assembly, with
//! cache writes on success. The engine stops at assembled evidence; answer
//! generation belongs to the chat layer.

pub mod engine;

pub use engine::QueryEngine;
