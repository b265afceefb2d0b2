use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{Index, TantivyDocument};

use askdb_core::traits::LexicalIndex;
use askdb_core::types::ChunkId;

use crate::analyzer::register_tokenizer;

/// Read-side adapter over per-collection tantivy indexes. Indexes open
/// lazily on first use and stay cached for the life of the adapter.
pub struct TantivyLexicalIndex {
    root: PathBuf,
    indexes: RwLock<HashMap<String, Index>>,
}

impl TantivyLexicalIndex {
    pub fn new(root: PathBuf) -> Self {
        Self { root, indexes: RwLock::new(HashMap::new()) }
    }

    fn open_index(&self, collection_id: &str) -> Result<Index> {
        if let Ok(indexes) = self.indexes.read() {
            if let Some(index) = indexes.get(collection_id) {
                return Ok(index.clone());
            }
        }
        let index = Index::open_in_dir(self.root.join(collection_id))?;
        register_tokenizer(&index);
        if let Ok(mut indexes) = self.indexes.write() {
            indexes.insert(collection_id.to_string(), index.clone());
        }
        Ok(index)
    }

    fn search_sync(
        &self,
        collection_id: &str,
        query_text: &str,
        top_n: usize,
    ) -> Result<Vec<(ChunkId, f32)>> {
        let index = self.open_index(collection_id)?;
        let schema = index.schema();
        let chunk_id_field = schema.get_field("chunk_id")?;
        let text_field = schema.get_field("text")?;

        let reader = index.reader()?;
        let searcher = reader.searcher();
        let query_parser = QueryParser::for_index(&index, vec![text_field]);
        // Free text may contain stray operators; a lenient parse keeps what
        // it can instead of rejecting the query.
        let (query, _errors) = query_parser.parse_query_lenient(query_text);
        let top_docs = searcher.search(&query, &TopDocs::with_limit(top_n))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let document: TantivyDocument = searcher.doc(addr)?;
            let chunk_id = document
                .get_first(chunk_id_field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            hits.push((chunk_id, score));
        }
        Ok(hits)
    }
}

#[async_trait]
impl LexicalIndex for TantivyLexicalIndex {
    async fn search(
        &self,
        collection_id: &str,
        query_text: &str,
        top_n: usize,
    ) -> Result<Vec<(ChunkId, f32)>> {
        self.search_sync(collection_id, query_text, top_n)
    }
}
