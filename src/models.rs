//! Core data models used throughout docanswer.
//!
//! These types represent the document chunks, retrieval results, and
//! generation descriptors that flow through the answering pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of retrievable content extracted from one source document.
///
/// Chunks are immutable once ingested: the corpus store never mutates
/// `content` or `embedding` after construction. A chunk without an
/// embedding is excluded from semantic ranking but remains eligible for
/// keyword scoring.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub id: String,
    /// File name of the originating document.
    pub source_name: String,
    /// Position of this chunk within its source document.
    pub chunk_index: i64,
    pub content: String,
    /// SHA-256 of `content`, for staleness detection.
    pub hash: String,
    /// Present only when a semantic backend embedded this chunk.
    pub embedding: Option<Vec<f32>>,
}

/// A chunk paired with its relevance score for one query.
///
/// Scores are non-negative; sequences of scored chunks are ordered by
/// descending score with ties broken by corpus insertion order.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f64,
}

/// One generation-model descriptor in the fallback ladder.
///
/// Tiers are tried in ascending `priority` order (fastest/cheapest first).
/// The list is immutable after configuration; the orchestrator selects a
/// tier per attempt and passes its model id explicitly to the backend.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ModelTier {
    pub model: String,
    pub priority: u32,
}

/// Normalized output of one generation call.
///
/// The backend adapter maps every provider-specific response shape into
/// this single form before it reaches the orchestrator.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub text: String,
}

/// Speaker of a [`ConversationTurn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One exchange entry in a chat session.
///
/// Owned by the session facade; the answering pipeline itself is stateless
/// across turns and never reads the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}
