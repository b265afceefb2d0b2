use std::sync::Arc;

use anyhow::Result;
use arrow_array::{
    FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};

use askdb_core::traits::VectorStore;
use askdb_core::types::{ChunkId, CollectionInfo, DocumentChunk, Meta};

use crate::schema::build_chunk_schema;

pub struct LanceVectorStore {
    conn: Connection,
    dim: i32,
}

impl LanceVectorStore {
    pub async fn connect(uri: &str, dim: usize) -> Result<Self> {
        let conn = connect(uri).execute().await?;
        Ok(Self { conn, dim: i32::try_from(dim)? })
    }

    /// Append chunks and their embeddings to a collection table, creating the
    /// table on first write.
    pub async fn append_chunks(
        &self,
        collection_id: &str,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        anyhow::ensure!(
            chunks.len() == embeddings.len(),
            "chunks and embeddings length must match"
        );
        let batch = self.chunks_to_record_batch(chunks, embeddings)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        if self.conn.table_names().execute().await?.contains(&collection_id.to_string()) {
            self.conn.open_table(collection_id).execute().await?.add(reader).execute().await?;
        } else {
            self.conn.create_table(collection_id, reader).execute().await?;
        }
        Ok(())
    }

    /// One `CollectionInfo` per table in the database.
    pub async fn collections(&self) -> Result<Vec<CollectionInfo>> {
        let mut out = Vec::new();
        for name in self.conn.table_names().execute().await? {
            let table = self.conn.open_table(&name).execute().await?;
            let chunk_count = table.count_rows(None).await?;
            out.push(CollectionInfo { collection_id: name, chunk_count, last_indexed_at: None });
        }
        Ok(out)
    }

    fn chunks_to_record_batch(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<RecordBatch> {
        let schema = build_chunk_schema(self.dim);
        let mut ids = Vec::new();
        let mut files = Vec::new();
        let mut texts = Vec::new();
        let mut token_counts = Vec::new();
        let mut positions = Vec::new();
        let mut totals = Vec::new();
        let mut metadatas = Vec::new();
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::new();
        for (chunk, embedding) in chunks.iter().zip(embeddings.iter()) {
            ids.push(chunk.chunk_id.clone());
            files.push(chunk.source_file_id.clone());
            texts.push(chunk.text.clone());
            token_counts.push(i32::try_from(chunk.token_count)?);
            positions.push(i32::try_from(chunk.position_index)?);
            totals.push(i32::try_from(chunk.total_chunks_in_file)?);
            metadatas.push(serde_json::to_string(&chunk.metadata)?);
            vectors.push(Some(embedding.iter().map(|&x| Some(x)).collect()));
        }
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(files)),
                Arc::new(StringArray::from(texts)),
                Arc::new(Int32Array::from(token_counts)),
                Arc::new(Int32Array::from(positions)),
                Arc::new(Int32Array::from(totals)),
                Arc::new(StringArray::from(metadatas)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(vectors.into_iter(), self.dim)),
            ],
        )?;
        Ok(batch)
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow::anyhow!("column {} missing or not utf8", name))
}

fn int_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int32Array> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| anyhow::anyhow!("column {} missing or not int32", name))
}

fn chunk_from_row(batch: &RecordBatch, i: usize, collection_id: &str) -> Result<DocumentChunk> {
    let metadata_raw = string_column(batch, "metadata")?.value(i);
    let metadata: Meta = if metadata_raw.is_empty() {
        Meta::new()
    } else {
        serde_json::from_str(metadata_raw)?
    };
    Ok(DocumentChunk {
        chunk_id: string_column(batch, "chunk_id")?.value(i).to_string(),
        source_file_id: string_column(batch, "source_file_id")?.value(i).to_string(),
        collection_id: collection_id.to_string(),
        text: string_column(batch, "text")?.value(i).to_string(),
        token_count: usize::try_from(int_column(batch, "token_count")?.value(i))?,
        position_index: usize::try_from(int_column(batch, "position_index")?.value(i))?,
        total_chunks_in_file: usize::try_from(int_column(batch, "total_chunks_in_file")?.value(i))?,
        metadata,
    })
}

#[async_trait]
impl VectorStore for LanceVectorStore {
    async fn search(
        &self,
        collection_id: &str,
        query_vector: &[f32],
        top_n: usize,
    ) -> Result<Vec<(ChunkId, f32)>> {
        let table = self.conn.open_table(collection_id).execute().await?;
        let mut stream = table.vector_search(query_vector.to_vec())?.limit(top_n).execute().await?;
        let mut hits = Vec::new();
        while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
            let ids = string_column(&batch, "chunk_id")?;
            for i in 0..batch.num_rows() {
                let score = if let Some(distance_col) = batch.column_by_name("_distance") {
                    distance_col
                        .as_any()
                        .downcast_ref::<Float32Array>()
                        .map(|col| 1.0 - col.value(i))
                        .unwrap_or(0.5)
                } else if let Some(score_col) = batch.column_by_name("_score") {
                    score_col
                        .as_any()
                        .downcast_ref::<Float32Array>()
                        .map(|col| col.value(i))
                        .unwrap_or(0.5)
                } else {
                    0.5
                };
                hits.push((ids.value(i).to_string(), score));
            }
        }
        Ok(hits)
    }

    async fn get_by_ids(
        &self,
        collection_id: &str,
        ids: &[ChunkId],
    ) -> Result<Vec<DocumentChunk>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let table = self.conn.open_table(collection_id).execute().await?;
        let quoted: Vec<String> =
            ids.iter().map(|id| format!("'{}'", id.replace('\'', "''"))).collect();
        let filter = format!("chunk_id IN ({})", quoted.join(", "));
        let mut stream = table.query().only_if(&filter).execute().await?;
        let mut chunks = Vec::with_capacity(ids.len());
        while let Some(batch) = TryStreamExt::try_next(&mut stream).await? {
            for i in 0..batch.num_rows() {
                chunks.push(chunk_from_row(&batch, i, collection_id)?);
            }
        }
        Ok(chunks)
    }
}
