use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("chunk_id", DataType::Utf8, false),
        Field::new("source_file_id", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("token_count", DataType::Int32, false),
        Field::new("position_index", DataType::Int32, false),
        Field::new("total_chunks_in_file", DataType::Int32, false),
        Field::new("metadata", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            true,
        ),
    ]))
}
