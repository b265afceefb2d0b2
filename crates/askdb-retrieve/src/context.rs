//! Context-window assembly.

use std::collections::HashMap;

use askdb_core::types::{ChunkId, DocumentChunk, RetrievalCandidate, SourceRef};

/// Minimum number of text characters worth keeping after a header; below
/// this, truncating a chunk adds noise instead of evidence.
const TRUNCATION_FLOOR: usize = 40;

pub struct AssembledContext {
    pub context_text: String,
    pub source_manifest: Vec<SourceRef>,
    pub warning: Option<String>,
}

/// Append ranked chunk texts, each under a source+position header, until the
/// character budget is reached.
///
/// A chunk that does not fit whole is skipped while any later candidate still
/// fits; only when nothing else fits may the final included chunk be
/// truncated. Synthesis queries that end up citing fewer than
/// `min_unique_sources` distinct files get a warning attached, never an
/// error.
pub fn assemble(
    ranked: &[RetrievalCandidate],
    chunks: &HashMap<ChunkId, DocumentChunk>,
    char_budget: usize,
    is_synthesis: bool,
    min_unique_sources: usize,
) -> AssembledContext {
    let mut context_text = String::new();
    let mut source_manifest: Vec<SourceRef> = Vec::new();
    let mut used = 0usize;

    for (i, cand) in ranked.iter().enumerate() {
        let Some(chunk) = chunks.get(&cand.chunk_id) else { continue };
        let header = header_for(chunk);
        let block_chars = header.chars().count() + chunk.text.chars().count() + 2;
        let remaining = char_budget.saturating_sub(used);

        if block_chars <= remaining {
            context_text.push_str(&header);
            context_text.push_str(&chunk.text);
            context_text.push_str("\n\n");
            used += block_chars;
            push_source(&mut source_manifest, chunk);
            continue;
        }

        let later_fits = ranked[i + 1..].iter().any(|c| {
            chunks
                .get(&c.chunk_id)
                .map(|ch| header_for(ch).chars().count() + ch.text.chars().count() + 2 <= remaining)
                .unwrap_or(false)
        });
        if later_fits {
            continue;
        }

        let header_chars = header.chars().count();
        if remaining > header_chars + TRUNCATION_FLOOR {
            let keep = remaining - header_chars - 2;
            let truncated: String = chunk.text.chars().take(keep).collect();
            context_text.push_str(&header);
            context_text.push_str(&truncated);
            context_text.push_str("\n\n");
            push_source(&mut source_manifest, chunk);
        }
        break;
    }

    let unique_sources = {
        let mut files: Vec<&str> =
            source_manifest.iter().map(|s| s.source_file_id.as_str()).collect();
        files.sort_unstable();
        files.dedup();
        files.len()
    };
    let warning = if is_synthesis && unique_sources < min_unique_sources {
        Some(format!(
            "Context draws on {} unique source file(s); {} were requested for synthesis coverage",
            unique_sources, min_unique_sources
        ))
    } else {
        None
    };

    AssembledContext { context_text, source_manifest, warning }
}

fn header_for(chunk: &DocumentChunk) -> String {
    format!(
        "[{} | part {}/{}]\n",
        chunk.source_file_id,
        chunk.position_index + 1,
        chunk.total_chunks_in_file
    )
}

fn push_source(manifest: &mut Vec<SourceRef>, chunk: &DocumentChunk) {
    let source = SourceRef {
        source_file_id: chunk.source_file_id.clone(),
        collection_id: chunk.collection_id.clone(),
    };
    if !manifest.contains(&source) {
        manifest.push(source);
    }
}
