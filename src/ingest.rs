//! Corpus loading boundary.
//!
//! Scans the configured docs directory for plain-text support documents,
//! chunks them on paragraph boundaries, optionally embeds them in batches,
//! and hands the result to an immutable [`CorpusStore`]. Richer document
//! formats (PDF, DOCX) are an external collaborator's job; this boundary
//! only consumes extracted text files.
//!
//! A missing or empty docs directory is not an error — the store degrades
//! to empty-corpus behavior and every query yields a "no documents"
//! result.
//!
//! [`CorpusHandle`] guards the one-time load: even under concurrent first
//! queries the scan-chunk-embed sequence executes at most once per
//! process.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::sync::Arc;
use tokio::sync::OnceCell;
use walkdir::WalkDir;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::corpus::CorpusStore;
use crate::embedding::{embed_texts, EmbeddingProvider};
use crate::models::DocumentChunk;

/// Scan, chunk, and (when a provider is active) embed the docs directory.
///
/// Embedding failures degrade the corpus to keyword-only retrieval rather
/// than failing the load; the chunks are kept without vectors.
pub async fn load_corpus(config: &Config, provider: &dyn EmbeddingProvider) -> Result<CorpusStore> {
    let docs_dir = &config.corpus.docs_dir;
    if !docs_dir.exists() {
        tracing::warn!(dir = %docs_dir.display(), "docs directory not found, corpus is empty");
        return Ok(CorpusStore::empty());
    }

    let include_set = build_globset(&config.corpus.include_globs)?;
    let exclude_set = build_globset(&config.corpus.exclude_globs)?;

    let mut files: Vec<(String, String)> = Vec::new();

    for entry in WalkDir::new(docs_dir) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(docs_dir).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| rel_str.clone());

        match std::fs::read_to_string(path) {
            Ok(body) => files.push((source_name, body)),
            Err(e) => {
                tracing::warn!(file = %rel_str, "skipping unreadable file: {}", e);
            }
        }
    }

    // Sort for deterministic corpus insertion order
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut chunks: Vec<DocumentChunk> = Vec::new();
    for (source_name, body) in &files {
        chunks.extend(chunk_text(source_name, body, config.corpus.max_chunk_chars));
    }

    tracing::info!(
        documents = files.len(),
        chunks = chunks.len(),
        "corpus loaded"
    );

    if provider.is_enabled() && !chunks.is_empty() {
        embed_chunks(config, provider, &mut chunks).await;
    }

    Ok(CorpusStore::new(chunks))
}

/// Attach embedding vectors to chunks, batch by batch.
///
/// A failed batch leaves its chunks without vectors and the load
/// continues; those chunks stay eligible for keyword scoring.
async fn embed_chunks(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    chunks: &mut [DocumentChunk],
) {
    let batch_size = config.embedding.batch_size.max(1);

    for batch in chunks.chunks_mut(batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
        match embed_texts(provider, &config.embedding, &texts).await {
            Ok(vectors) => {
                for (chunk, vector) in batch.iter_mut().zip(vectors) {
                    chunk.embedding = Some(vector);
                }
            }
            Err(e) => {
                tracing::warn!("embedding batch failed, chunks stay keyword-only: {}", e);
            }
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// At-most-once corpus initialization shared across concurrent requests.
pub struct CorpusHandle {
    cell: OnceCell<Arc<CorpusStore>>,
}

impl CorpusHandle {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Load the corpus on first call and return the shared store
    /// thereafter. A failed load logs and yields an empty store; it is
    /// not retried within this process.
    pub async fn get_or_load(
        &self,
        config: &Config,
        provider: &dyn EmbeddingProvider,
    ) -> Arc<CorpusStore> {
        self.cell
            .get_or_init(|| async {
                match load_corpus(config, provider).await {
                    Ok(store) => Arc::new(store),
                    Err(e) => {
                        tracing::error!("corpus load failed: {}", e);
                        Arc::new(CorpusStore::empty())
                    }
                }
            })
            .await
            .clone()
    }

    /// Whether the one-time load has completed.
    pub fn loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl Default for CorpusHandle {
    fn default() -> Self {
        Self::new()
    }
}
