//! In-memory corpus store with keyword and semantic ranking.
//!
//! The [`CorpusStore`] owns every ingested [`DocumentChunk`] and is
//! immutable after construction, so concurrent reads from multiple
//! answer requests need no locking. Two ranking paths are provided:
//!
//! - **Keyword scoring** — the always-available path. Query words of
//!   length > 2 are matched against chunk content and source file names:
//!   `score = 50·[exact phrase] + 5·Σ(word occurrences) + 10·[word in
//!   source name]`. Zero-scoring chunks are discarded.
//! - **Semantic ranking** — cosine similarity between a precomputed query
//!   embedding and chunk embeddings. Chunks without embeddings are skipped.
//!
//! Both paths order by descending score with ties broken by corpus
//! insertion order, and both return an empty result (never an error) for
//! an empty corpus.

use crate::embedding::cosine_similarity;
use crate::models::{DocumentChunk, ScoredChunk};

/// Weight for an exact query phrase occurring in chunk content.
const PHRASE_WEIGHT: f64 = 50.0;
/// Weight per occurrence of an individual query word.
const WORD_WEIGHT: f64 = 5.0;
/// Weight for a query word appearing in the source file name.
const SOURCE_NAME_WEIGHT: f64 = 10.0;

/// Immutable set of document chunks, queryable by keyword or embedding.
pub struct CorpusStore {
    chunks: Vec<DocumentChunk>,
}

impl CorpusStore {
    /// Build a store from ingested chunks, preserving insertion order.
    pub fn new(chunks: Vec<DocumentChunk>) -> Self {
        Self { chunks }
    }

    /// An empty corpus; every search yields an empty result.
    pub fn empty() -> Self {
        Self { chunks: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Number of distinct source documents.
    pub fn document_count(&self) -> usize {
        let mut names: Vec<&str> = self.chunks.iter().map(|c| c.source_name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names.len()
    }

    /// Whether any chunk carries an embedding vector.
    pub fn has_embeddings(&self) -> bool {
        self.chunks.iter().any(|c| c.embedding.is_some())
    }

    /// Rank chunks against the query using keyword scoring.
    ///
    /// Tokenizes the query into lowercase words of length > 2, scores every
    /// chunk, discards zero scores, and returns the top `limit` in
    /// descending order (stable, so equal scores keep insertion order).
    pub fn keyword_search(&self, query: &str, limit: usize) -> Vec<ScoredChunk> {
        let query_lower = query.trim().to_lowercase();
        let words: Vec<&str> = query_lower
            .split_whitespace()
            .filter(|w| w.len() > 2)
            .collect();

        if query_lower.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let score = keyword_score(chunk, &query_lower, &words);
                if score > 0.0 {
                    Some(ScoredChunk {
                        chunk: chunk.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        scored
    }

    /// Rank embedded chunks by cosine similarity to the query vector.
    ///
    /// Chunks without embeddings are excluded. Similarities are clamped to
    /// non-negative scores so downstream ordering invariants hold.
    pub fn semantic_search(&self, query_vec: &[f32], limit: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let vec = chunk.embedding.as_ref()?;
                let sim = cosine_similarity(query_vec, vec) as f64;
                Some(ScoredChunk {
                    chunk: chunk.clone(),
                    score: sim.max(0.0),
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        scored
    }
}

fn keyword_score(chunk: &DocumentChunk, query_lower: &str, words: &[&str]) -> f64 {
    let content_lower = chunk.content.to_lowercase();
    let source_lower = chunk.source_name.to_lowercase();

    let mut score = 0.0;

    if content_lower.contains(query_lower) {
        score += PHRASE_WEIGHT;
    }

    for word in words {
        let count = content_lower.matches(word).count();
        score += count as f64 * WORD_WEIGHT;

        if source_lower.contains(word) {
            score += SOURCE_NAME_WEIGHT;
        }
    }

    score
}
