//! Pipeline readiness reporting.
//!
//! Computes a [`PipelineStatus`] snapshot on demand from cheap,
//! non-mutating probes: credential presence, corpus load state, and
//! which retrieval backend initialized. No probe performs network I/O,
//! so `status()` is always fast and bounded; generation liveness is
//! observed on use and reported through answer content instead.

use serde::Serialize;

use crate::corpus::CorpusStore;

/// Which retrieval backend the pipeline is currently operating with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Embedding provider active and the corpus carries vectors.
    Semantic,
    /// Keyword scoring only.
    KeywordOnly,
    /// No corpus loaded or corpus empty.
    Unavailable,
}

/// Point-in-time readiness snapshot for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub api_key_present: bool,
    pub corpus_ready: bool,
    pub generation_ready: bool,
    pub document_count: usize,
    pub mode: PipelineMode,
}

/// Compute the current status snapshot.
///
/// `corpus_loaded` reflects whether the one-time load completed;
/// `generation_ready` whether a credentialed generation backend with a
/// non-empty tier list was constructed at startup.
pub fn probe(corpus: &CorpusStore, corpus_loaded: bool, generation_ready: bool) -> PipelineStatus {
    let api_key_present = std::env::var("GOOGLE_API_KEY")
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);

    let corpus_ready = corpus_loaded && !corpus.is_empty();

    let mode = if !corpus_ready {
        PipelineMode::Unavailable
    } else if corpus.has_embeddings() {
        PipelineMode::Semantic
    } else {
        PipelineMode::KeywordOnly
    };

    PipelineStatus {
        api_key_present,
        corpus_ready,
        generation_ready,
        document_count: corpus.document_count(),
        mode,
    }
}

/// Probe readiness from configuration alone.
///
/// Unlike pipeline assembly, this never fails: a missing generation
/// credential is reported as `generation_ready: false` so the status
/// command stays usable for diagnosing exactly that condition.
pub async fn probe_from_config(config: &crate::config::Config) -> PipelineStatus {
    use crate::embedding::{create_provider, DisabledProvider, EmbeddingProvider};
    use crate::generation::HttpGenerationBackend;
    use crate::ingest::CorpusHandle;

    let provider: Box<dyn EmbeddingProvider> = match create_provider(&config.embedding) {
        Ok(p) => p,
        Err(_) => Box::new(DisabledProvider),
    };

    let handle = CorpusHandle::new();
    let corpus = handle.get_or_load(config, provider.as_ref()).await;

    let generation_ready = !config.generation.tiers.is_empty()
        && HttpGenerationBackend::new(&config.generation).is_ok();

    probe(&corpus, true, generation_ready)
}
