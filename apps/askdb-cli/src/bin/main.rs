use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use askdb_core::config::RetrievalConfig;
use askdb_core::error::Error;
use askdb_core::traits::{CrossEncoder, EmbeddingProvider, VectorStore};
use askdb_core::types::{CollectionScope, DocumentChunk};
use askdb_embed::{HashingProvider, DEFAULT_DIM};
use askdb_lexical::{CollectionWriter, TantivyLexicalIndex};
use askdb_pipeline::QueryEngine;
use askdb_query::classify;
use askdb_vector::LanceVectorStore;

const MAX_CHUNK_TOKENS: usize = 500;
const WORDS_PER_SUBCHUNK: usize = 300;
const OVERLAP_PERCENT: f32 = 0.2;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <ingest|ask> [args...]", prog);
        eprintln!("  {} ingest <collection> [data_dir] [index_root]", prog);
        eprintln!("  {} ask \"<query>\" [collection] [index_root]", prog);
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => ingest(&args).await,
        "ask" => ask(&args).await,
        _ => {
            eprintln!("Unknown command: {}", cmd);
            std::process::exit(1);
        }
    }
}

async fn ingest(args: &[String]) -> Result<()> {
    let collection = args.first().cloned().unwrap_or_else(|| {
        eprintln!("Usage: askdb ingest <collection> [data_dir] [index_root]");
        std::process::exit(1)
    });
    let data_dir = args.get(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./data"));
    let index_root = args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./indexes"));

    println!("Ingesting {} into collection '{}'", data_dir.display(), collection);
    let files = list_txt_files(&data_dir);
    if files.is_empty() {
        println!("No .txt files found under {}.", data_dir.display());
        return Ok(());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}")?
            .progress_chars("#>-"),
    );
    let mut chunks = Vec::new();
    for file in &files {
        pb.set_message(format!("{}", file.display()));
        let content = std::fs::read_to_string(file)
            .or_else(|_| std::fs::read(file).map(|b| String::from_utf8_lossy(&b).to_string()))?;
        chunks.extend(chunk_document(&content, file, &collection));
        pb.inc(1);
    }
    pb.finish_with_message("chunked");
    println!("Processed {} files into {} chunks", files.len(), chunks.len());

    let writer = CollectionWriter::create(&index_root.join("tantivy"), &collection)?;
    writer.add_chunks(&chunks)?;

    let embedder = HashingProvider::new(DEFAULT_DIM);
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;
    let store = LanceVectorStore::connect(
        index_root.join("lancedb").to_string_lossy().as_ref(),
        DEFAULT_DIM,
    )
    .await?;
    store.append_chunks(&collection, &chunks, &embeddings).await?;

    println!("✅ Ingest complete ({} chunks, provider {})", chunks.len(), embedder.provider_id());
    Ok(())
}

async fn ask(args: &[String]) -> Result<()> {
    let query = args.first().cloned().unwrap_or_else(|| {
        eprintln!("Usage: askdb ask \"<query>\" [collection] [index_root]");
        std::process::exit(1)
    });
    let scope = match args.get(1).map(String::as_str) {
        None | Some("--all") => CollectionScope::All,
        Some(collection) => CollectionScope::Single(collection.to_string()),
    };
    let index_root = args.get(2).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./indexes"));

    let cfg = RetrievalConfig::load()?;
    let store = Arc::new(
        LanceVectorStore::connect(
            index_root.join("lancedb").to_string_lossy().as_ref(),
            DEFAULT_DIM,
        )
        .await?,
    );
    let collections = store.collections().await?;
    let engine = QueryEngine::new(
        Arc::new(HashingProvider::new(DEFAULT_DIM)),
        Arc::new(TantivyLexicalIndex::new(index_root.join("tantivy"))),
        Arc::clone(&store) as Arc<dyn VectorStore>,
        Arc::new(OverlapEncoder),
        None,
        collections,
        cfg,
    );

    let classification = classify(&query);
    if classification.is_synthesis {
        println!("🧩 Synthesis query detected ({:?})", classification.signals);
    }

    match engine.answer_query(&query, scope, None).await {
        Ok(answer) => {
            println!("\n🔍 Evidence for: \"{}\"  (cache: {:?})", query, answer.cache_hit);
            for warning in &answer.warnings {
                println!("⚠️  {}", warning);
            }
            println!("\n{}", answer.context_text);
            println!("📚 Sources:");
            for source in &answer.source_manifest {
                println!("  - {} ({})", source.source_file_id, source.collection_id);
            }
            Ok(())
        }
        Err(Error::RetrievalFailed) => {
            println!("No relevant information found.");
            Ok(())
        }
        Err(Error::EmptyQuery) => {
            println!("Please provide a non-empty question.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Local stand-in for a cross-encoder service: scores a pair by the share of
/// query words the chunk text contains.
struct OverlapEncoder;

#[async_trait]
impl CrossEncoder for OverlapEncoder {
    async fn score_pairs(&self, query_text: &str, texts: &[String]) -> Result<Vec<f32>> {
        let query_lower = query_text.to_lowercase();
        let query_words: Vec<&str> = query_lower.split_whitespace().collect();
        if query_words.is_empty() {
            return Ok(vec![0.0; texts.len()]);
        }
        Ok(texts
            .iter()
            .map(|text| {
                let text_lower = text.to_lowercase();
                let matched =
                    query_words.iter().filter(|w| text_lower.contains(*w)).count() as f32;
                matched / query_words.len() as f32
            })
            .collect())
    }
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("txt") {
            txt_files.push(path.to_path_buf());
        }
    }
    txt_files.sort();
    txt_files
}

fn chunk_document(content: &str, path: &Path, collection: &str) -> Vec<DocumentChunk> {
    let source_file_id = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let stem = path
        .file_stem()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| source_file_id.clone());

    let mut chunks = Vec::new();
    let mut position_index = 0usize;
    for paragraph in content.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        let pieces = if estimate_tokens(paragraph) <= MAX_CHUNK_TOKENS {
            vec![paragraph.to_string()]
        } else {
            split_with_overlap(paragraph)
        };
        for text in pieces {
            chunks.push(DocumentChunk {
                chunk_id: format!("{}:{}", stem, position_index),
                source_file_id: source_file_id.clone(),
                collection_id: collection.to_string(),
                token_count: estimate_tokens(&text),
                text,
                position_index,
                total_chunks_in_file: 0,
                metadata: HashMap::new(),
            });
            position_index += 1;
        }
    }
    let total = chunks.len();
    for chunk in &mut chunks {
        chunk.total_chunks_in_file = total;
    }
    chunks
}

fn estimate_tokens(text: &str) -> usize {
    let word_count = text.split_whitespace().count();
    (word_count as f32 / 0.75) as usize
}

fn split_with_overlap(paragraph: &str) -> Vec<String> {
    let words: Vec<&str> = paragraph.split_whitespace().collect();
    let overlap_words = (WORDS_PER_SUBCHUNK as f32 * OVERLAP_PERCENT) as usize;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let end = (start + WORDS_PER_SUBCHUNK).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end >= words.len() {
            break;
        }
        start = end - overlap_words;
    }
    chunks
}
