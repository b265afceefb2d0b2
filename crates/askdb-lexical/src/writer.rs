//! Index construction for one collection. Used by ingestion tooling; the
//! pipeline itself only ever reads.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tantivy::{doc, Index};

use askdb_core::types::DocumentChunk;

use crate::analyzer::{build_schema, register_tokenizer};

pub struct CollectionWriter {
    index: Index,
    chunk_id_field: tantivy::schema::Field,
    source_file_field: tantivy::schema::Field,
    text_field: tantivy::schema::Field,
}

impl CollectionWriter {
    /// Create (or recreate) the index directory for a collection.
    pub fn create(root: &Path, collection_id: &str) -> Result<Self> {
        let index_dir: PathBuf = root.join(collection_id);
        if index_dir.exists() {
            std::fs::remove_dir_all(&index_dir)?;
        }
        std::fs::create_dir_all(&index_dir)?;
        let schema = build_schema();
        let index = Index::create_in_dir(&index_dir, schema.clone())?;
        register_tokenizer(&index);
        let chunk_id_field = schema.get_field("chunk_id")?;
        let source_file_field = schema.get_field("source_file_id")?;
        let text_field = schema.get_field("text")?;
        Ok(Self { index, chunk_id_field, source_file_field, text_field })
    }

    pub fn add_chunks(&self, chunks: &[DocumentChunk]) -> Result<usize> {
        let mut index_writer = self.index.writer(50_000_000)?;
        for c in chunks {
            let document = doc!(
                self.chunk_id_field => c.chunk_id.clone(),
                self.source_file_field => c.source_file_id.clone(),
                self.text_field => c.text.clone(),
            );
            index_writer.add_document(document)?;
        }
        index_writer.commit()?;
        Ok(chunks.len())
    }
}
