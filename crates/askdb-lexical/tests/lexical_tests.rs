use std::collections::HashMap;

use askdb_core::traits::LexicalIndex;
use askdb_core::types::DocumentChunk;
use askdb_lexical::{CollectionWriter, TantivyLexicalIndex};

fn chunk(id: &str, file: &str, text: &str) -> DocumentChunk {
    DocumentChunk {
        chunk_id: id.to_string(),
        source_file_id: file.to_string(),
        collection_id: "manuals".to_string(),
        text: text.to_string(),
        token_count: text.split_whitespace().count(),
        position_index: 0,
        total_chunks_in_file: 1,
        metadata: HashMap::new(),
    }
}

#[tokio::test]
async fn indexed_chunks_are_searchable_by_keyword() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let writer = CollectionWriter::create(tmp.path(), "manuals").expect("create");
    writer
        .add_chunks(&[
            chunk("solar:0", "solar.txt", "Solar panel maintenance requires seasonal cleaning."),
            chunk("well:0", "well.txt", "Well pump pressure should stay within the green band."),
        ])
        .expect("add");

    let index = TantivyLexicalIndex::new(tmp.path().to_path_buf());
    let hits = index.search("manuals", "solar cleaning", 10).await.expect("search");

    assert!(!hits.is_empty());
    assert_eq!(hits[0].0, "solar:0");
    assert!(hits[0].1 > 0.0);
}

#[tokio::test]
async fn stray_query_operators_do_not_fail_the_search() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let writer = CollectionWriter::create(tmp.path(), "manuals").expect("create");
    writer
        .add_chunks(&[chunk("solar:0", "solar.txt", "Solar panel maintenance basics.")])
        .expect("add");

    let index = TantivyLexicalIndex::new(tmp.path().to_path_buf());
    let result = index.search("manuals", "solar AND AND (", 10).await;
    assert!(result.is_ok(), "lenient parsing should absorb operator noise");
}

#[tokio::test]
async fn unknown_collection_is_an_error() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let index = TantivyLexicalIndex::new(tmp.path().to_path_buf());
    assert!(index.search("missing", "anything", 5).await.is_err());
}
