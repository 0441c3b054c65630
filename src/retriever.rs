//! Retrieval policy and result formatting.
//!
//! A thin layer over the [`CorpusStore`] that decides which ranking path
//! to use for a query and renders results into the two shapes the
//! orchestrator needs:
//!
//! - [`Retriever::format_context`] — prompt-ready grounding text, one
//!   best-window snippet per chunk annotated with its source file name,
//!   bounded to keep prompt size in check.
//! - [`Retriever::format_for_display`] — a human-readable numbered list,
//!   used only by the document-fallback path.
//!
//! When an embedding provider is active the retriever embeds the query
//! and ranks semantically; if the query embedding fails (or no provider
//! is configured) it degrades to keyword scoring for that query instead
//! of failing the request.

use std::sync::Arc;

use crate::config::{EmbeddingConfig, RetrievalConfig};
use crate::corpus::CorpusStore;
use crate::embedding::{embed_query, EmbeddingProvider};
use crate::models::ScoredChunk;

pub struct Retriever {
    corpus: Arc<CorpusStore>,
    provider: Arc<dyn EmbeddingProvider>,
    embedding_config: EmbeddingConfig,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        corpus: Arc<CorpusStore>,
        provider: Arc<dyn EmbeddingProvider>,
        embedding_config: EmbeddingConfig,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            corpus,
            provider,
            embedding_config,
            config,
        }
    }

    /// The configured default result limit.
    pub fn default_limit(&self) -> usize {
        self.config.limit
    }

    /// Whether the semantic path is usable for this corpus.
    pub fn semantic_active(&self) -> bool {
        self.provider.is_enabled() && self.corpus.has_embeddings()
    }

    /// Whether the underlying corpus holds no chunks at all.
    pub fn corpus_is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    /// Return the top `limit` chunks for the query.
    ///
    /// Uses semantic ranking when available, falling back to keyword
    /// scoring when the provider is disabled or the query embedding
    /// fails. An empty corpus yields an empty result, never an error.
    pub async fn retrieve(&self, query: &str, limit: usize) -> Vec<ScoredChunk> {
        if self.corpus.is_empty() {
            return Vec::new();
        }

        if self.semantic_active() {
            match embed_query(self.provider.as_ref(), &self.embedding_config, query).await {
                Ok(query_vec) => return self.corpus.semantic_search(&query_vec, limit),
                Err(e) => {
                    tracing::warn!("query embedding failed, using keyword scoring: {}", e);
                }
            }
        }

        self.corpus.keyword_search(query, limit)
    }

    /// Render results as grounding context for the generation prompt.
    ///
    /// One snippet per chunk, prefixed with its source file name and
    /// joined by blank lines.
    pub fn format_context(&self, query: &str, results: &[ScoredChunk]) -> String {
        let words = query_words(query);
        results
            .iter()
            .map(|r| {
                let snippet = best_snippet(&r.chunk.content, &words, self.config.context_chars);
                format!("From {}:\n{}", r.chunk.source_name, snippet)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Render results as a numbered listing for the document-fallback
    /// answer.
    pub fn format_for_display(&self, query: &str, results: &[ScoredChunk]) -> String {
        if results.is_empty() {
            return "No relevant documents found.".to_string();
        }

        let words = query_words(query);
        let mut parts = vec![format!("Found {} relevant document(s):", results.len())];
        for (i, r) in results.iter().enumerate() {
            let snippet = best_snippet(&r.chunk.content, &words, self.config.snippet_chars);
            parts.push(format!(
                "Result {} (from {}):\n{}",
                i + 1,
                r.chunk.source_name,
                snippet
            ));
        }
        parts.join("\n\n")
    }
}

/// Lowercased query words of length > 2, the same tokenization the
/// keyword scorer uses.
fn query_words(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .map(|w| w.to_string())
        .collect()
}

/// Extract the `window` characters of `content` densest in query words.
///
/// Slides a window in 50-char steps, counts query word occurrences in
/// each, and returns the best-scoring window with `...` affixes when
/// text was cut. Content shorter than the window is returned whole.
fn best_snippet(content: &str, words: &[String], window: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= window {
        return content.to_string();
    }

    let content_lower = content.to_lowercase();
    let lower_chars: Vec<char> = content_lower.chars().collect();

    let mut best_pos = 0;
    let mut best_score = 0usize;

    let mut pos = 0;
    while pos + window <= lower_chars.len() {
        let section: String = lower_chars[pos..pos + window].iter().collect();
        let score: usize = words.iter().map(|w| section.matches(w.as_str()).count()).sum();
        if score > best_score {
            best_score = score;
            best_pos = pos;
        }
        pos += 50;
    }

    let mut snippet: String = chars[best_pos..(best_pos + window).min(chars.len())]
        .iter()
        .collect();
    if best_pos > 0 {
        snippet = format!("...{}", snippet);
    }
    if best_pos + window < chars.len() {
        snippet = format!("{}...", snippet);
    }
    snippet
}
