//! Application assembly.
//!
//! Wires configuration into a ready [`AnswerPipeline`]: resolves the
//! embedding strategy once at startup, performs the guarded one-time
//! corpus load, and constructs the credentialed generation backend. All
//! services are explicitly constructed and injected — nothing reaches
//! for ambient globals, and everything is immutable after assembly, so
//! one [`Assistant`] can serve concurrent sessions behind an `Arc`.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::answer::AnswerPipeline;
use crate::config::Config;
use crate::corpus::CorpusStore;
use crate::embedding::{create_provider, DisabledProvider, EmbeddingProvider};
use crate::generation::HttpGenerationBackend;
use crate::ingest::CorpusHandle;
use crate::retriever::Retriever;
use crate::status::{probe, PipelineStatus};

pub struct Assistant {
    corpus: Arc<CorpusStore>,
    pipeline: AnswerPipeline,
}

impl Assistant {
    /// Assemble the full pipeline from configuration.
    ///
    /// A missing generation credential is a hard startup failure; a
    /// failed embedding provider construction degrades to keyword-only
    /// retrieval instead.
    pub async fn initialize(config: &Config) -> Result<Self> {
        let provider: Arc<dyn EmbeddingProvider> = match create_provider(&config.embedding) {
            Ok(p) => Arc::from(p),
            Err(e) => {
                tracing::warn!("embedding provider unavailable, keyword-only retrieval: {}", e);
                Arc::new(DisabledProvider)
            }
        };

        let handle = CorpusHandle::new();
        let corpus = handle.get_or_load(config, provider.as_ref()).await;

        let backend = HttpGenerationBackend::new(&config.generation)
            .context("generation backend construction failed")?;

        let retriever = Retriever::new(
            corpus.clone(),
            provider,
            config.embedding.clone(),
            config.retrieval.clone(),
        );

        let pipeline = AnswerPipeline::new(retriever, Arc::new(backend), &config.generation);

        Ok(Self { corpus, pipeline })
    }

    /// Answer a question; never fails.
    pub async fn answer(&self, question: &str) -> String {
        self.pipeline.answer(question).await
    }

    /// Document-only search listing (no generation involved).
    pub async fn search(&self, query: &str, limit: usize) -> String {
        let results = self.pipeline.retriever().retrieve(query, limit).await;
        self.pipeline.retriever().format_for_display(query, &results)
    }

    /// Current readiness snapshot.
    pub fn status(&self) -> PipelineStatus {
        // An assembled assistant always has a loaded corpus and a
        // credentialed backend
        probe(&self.corpus, true, true)
    }
}
