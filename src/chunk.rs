//! Paragraph-boundary text chunker.
//!
//! Splits a source document's text into [`DocumentChunk`]s that respect a
//! configurable `max_chars` limit. Splitting occurs on paragraph boundaries
//! (`\n\n`) to preserve semantic coherence within each chunk.
//!
//! Each chunk receives a UUID, the originating file name, and a SHA-256
//! hash of its text. Embeddings are attached later by the ingestion step
//! when a semantic backend is configured.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::DocumentChunk;

/// Split text into chunks on paragraph boundaries, respecting `max_chars`.
/// Returns chunks with contiguous indices starting at 0. Documents whose
/// text is entirely whitespace produce no chunks.
pub fn chunk_text(source_name: &str, text: &str, max_chars: usize) -> Vec<DocumentChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let paragraphs: Vec<&str> = text.split("\n\n").collect();
    let mut chunks = Vec::new();
    let mut current_buf = String::new();
    let mut chunk_index: i64 = 0;

    for para in paragraphs {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        // If adding this paragraph would exceed max, flush current buffer
        let would_be = if current_buf.is_empty() {
            trimmed.len()
        } else {
            current_buf.len() + 2 + trimmed.len() // +2 for \n\n separator
        };

        if would_be > max_chars && !current_buf.is_empty() {
            chunks.push(make_chunk(source_name, chunk_index, &current_buf));
            chunk_index += 1;
            current_buf.clear();
        }

        // If a single paragraph exceeds max, hard-split it
        if trimmed.len() > max_chars {
            if !current_buf.is_empty() {
                chunks.push(make_chunk(source_name, chunk_index, &current_buf));
                chunk_index += 1;
                current_buf.clear();
            }
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let split_at = remaining.len().min(max_chars);
                // Prefer a newline or space boundary over a mid-word cut
                let actual_split = if split_at < remaining.len() {
                    remaining[..split_at]
                        .rfind('\n')
                        .or_else(|| remaining[..split_at].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(split_at)
                } else {
                    split_at
                };
                let piece = &remaining[..actual_split];
                if !piece.trim().is_empty() {
                    chunks.push(make_chunk(source_name, chunk_index, piece.trim()));
                    chunk_index += 1;
                }
                remaining = &remaining[actual_split..];
            }
        } else {
            if !current_buf.is_empty() {
                current_buf.push_str("\n\n");
            }
            current_buf.push_str(trimmed);
        }
    }

    if !current_buf.is_empty() {
        chunks.push(make_chunk(source_name, chunk_index, &current_buf));
    }

    chunks
}

fn make_chunk(source_name: &str, index: i64, text: &str) -> DocumentChunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    DocumentChunk {
        id: Uuid::new_v4().to_string(),
        source_name: source_name.to_string(),
        chunk_index: index,
        content: text.to_string(),
        hash,
        embedding: None,
    }
}
