//! The answer orchestrator.
//!
//! Sequences one question through the full pipeline: input validation,
//! retrieval, grounding-prompt construction, tiered generation attempts
//! with quota backoff, and the deterministic document fallback. The
//! fallback ladder — semantic generation, next-tier model, keyword-only
//! document listing — guarantees every call returns *something* useful
//! instead of propagating a failure to the end user.
//!
//! [`AnswerPipeline::answer`] never fails: every path, including total
//! generation exhaustion and an empty corpus, resolves to a returned
//! string. Diagnostics belong to the status facade, not the answer text.

use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::generation::{GenerationBackend, GenerationError};
use crate::models::{ModelTier, ScoredChunk};
use crate::retriever::Retriever;

/// Returned for blank or whitespace-only input.
const VALIDATION_MESSAGE: &str = "Please ask a non-empty question.";

/// Notice prefixed to every document-fallback answer.
const FALLBACK_NOTICE: &str =
    "AI generation is currently unavailable. Here is what the documents say:";

/// Returned when the corpus holds no documents at all.
const EMPTY_CORPUS_MESSAGE: &str =
    "No documents are available to search. The document corpus is empty.";

/// System instructions for the grounding prompt.
const PROMPT_INSTRUCTIONS: &str =
    "You are a helpful assistant that answers questions based on provided document context.";

/// Orchestrates retrieval, generation, and fallback for one question at a
/// time. Stateless across calls; safe to share behind an `Arc` between
/// concurrent requests.
pub struct AnswerPipeline {
    retriever: Retriever,
    backend: Arc<dyn GenerationBackend>,
    tiers: Vec<ModelTier>,
    max_attempts: usize,
    backoff: Duration,
}

impl AnswerPipeline {
    pub fn new(
        retriever: Retriever,
        backend: Arc<dyn GenerationBackend>,
        config: &GenerationConfig,
    ) -> Self {
        Self {
            retriever,
            backend,
            tiers: config.tiers.clone(),
            max_attempts: config.effective_max_attempts(),
            backoff: Duration::from_secs(config.backoff_secs),
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer one question. Never fails; every failure path resolves to a
    /// degraded but useful string.
    pub async fn answer(&self, question: &str) -> String {
        let question = question.trim();
        if question.is_empty() {
            return VALIDATION_MESSAGE.to_string();
        }

        tracing::info!(question = %truncate_for_log(question), "answering question");

        let limit = self.retriever.default_limit();
        let results = self.retriever.retrieve(question, limit).await;

        if results.is_empty() {
            tracing::info!("no retrieval results, returning document fallback");
            return self.no_results_message(question);
        }

        let context = self.retriever.format_context(question, &results);
        let prompt = build_prompt(&context, question);

        match self.generate_with_tiers(&prompt).await {
            Some(text) => text,
            None => self.document_fallback(question, &results),
        }
    }

    /// Iterate tiers in priority order, up to the attempt budget.
    ///
    /// Returns the trimmed generated text on the first success. Quota
    /// failures advance to the next tier after a fixed backoff; transient
    /// and empty-response failures retry while attempts remain. `None`
    /// means every attempt was exhausted (or no tier is configured) and
    /// the caller must fall back.
    async fn generate_with_tiers(&self, prompt: &str) -> Option<String> {
        if self.tiers.is_empty() {
            tracing::warn!("no generation tiers configured, skipping generation");
            return None;
        }

        let mut tier_idx = 0;

        for attempt in 0..self.max_attempts {
            let tier = &self.tiers[tier_idx.min(self.tiers.len() - 1)];
            tracing::debug!(attempt, model = %tier.model, "generation attempt");

            match self.backend.generate(prompt, &tier.model).await {
                Ok(result) => {
                    let text = result.text.trim();
                    if !text.is_empty() {
                        tracing::info!(model = %tier.model, "generation succeeded");
                        return Some(text.to_string());
                    }
                    // Trimmed-to-nothing counts as an empty response
                    if attempt + 1 >= self.max_attempts {
                        break;
                    }
                    tier_idx = (tier_idx + 1).min(self.tiers.len() - 1);
                }
                Err(GenerationError::Quota { message }) => {
                    tracing::warn!(model = %tier.model, %message, "quota exhausted");
                    if tier_idx + 1 < self.tiers.len() && attempt + 1 < self.max_attempts {
                        tokio::time::sleep(self.backoff).await;
                        tier_idx += 1;
                    } else {
                        break;
                    }
                }
                Err(e @ (GenerationError::Transient { .. } | GenerationError::Empty)) => {
                    tracing::warn!(model = %tier.model, error = %e, "generation attempt failed");
                    if attempt + 1 >= self.max_attempts {
                        break;
                    }
                    tier_idx = (tier_idx + 1).min(self.tiers.len() - 1);
                }
            }
        }

        tracing::info!("all generation attempts exhausted, falling back to documents");
        None
    }

    fn no_results_message(&self, question: &str) -> String {
        if self.retriever.corpus_is_empty() {
            EMPTY_CORPUS_MESSAGE.to_string()
        } else {
            format!(
                "No relevant documents found for: '{}'. Try rephrasing your question or asking about a different topic.",
                question
            )
        }
    }

    fn document_fallback(&self, question: &str, results: &[ScoredChunk]) -> String {
        format!(
            "{}\n\n{}",
            FALLBACK_NOTICE,
            self.retriever.format_for_display(question, results)
        )
    }
}

/// Assemble the grounding prompt from system instructions, retrieved
/// context, and the user's question.
fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "{}\n\nContext from support documents:\n{}\n\nUser Question: {}\n\n\
         Please provide a helpful, accurate answer based on the context above. \
         If the context does not contain enough information to fully answer the \
         question, say so and provide what information you can find.\n\nAnswer:",
        PROMPT_INSTRUCTIONS, context, question
    )
}

fn truncate_for_log(text: &str) -> String {
    text.chars().take(100).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::corpus::CorpusStore;
    use crate::embedding::DisabledProvider;
    use crate::generation::GenerationError;
    use crate::models::{DocumentChunk, GenerationResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted backend: pops one pre-planned result per call and records
    /// the model each call asked for.
    struct ScriptedBackend {
        script: Mutex<VecDeque<Result<GenerationResult, GenerationError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<GenerationResult, GenerationError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(
            &self,
            _prompt: &str,
            model: &str,
        ) -> Result<GenerationResult, GenerationError> {
            self.calls.lock().unwrap().push(model.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenerationError::Empty))
        }
    }

    fn ok(text: &str) -> Result<GenerationResult, GenerationError> {
        Ok(GenerationResult {
            text: text.to_string(),
        })
    }

    fn quota() -> Result<GenerationResult, GenerationError> {
        Err(GenerationError::Quota {
            message: "429 Too Many Requests".to_string(),
        })
    }

    fn transient() -> Result<GenerationResult, GenerationError> {
        Err(GenerationError::Transient {
            message: "connection reset".to_string(),
        })
    }

    fn make_chunk(source: &str, content: &str) -> DocumentChunk {
        DocumentChunk {
            id: uuid::Uuid::new_v4().to_string(),
            source_name: source.to_string(),
            chunk_index: 0,
            content: content.to_string(),
            hash: String::new(),
            embedding: None,
        }
    }

    fn support_chunks() -> Vec<DocumentChunk> {
        vec![
            make_chunk("security.txt", "Reset your password from Settings > Security"),
            make_chunk("billing.txt", "Billing cycles run monthly"),
        ]
    }

    fn make_pipeline(
        chunks: Vec<DocumentChunk>,
        backend: Arc<ScriptedBackend>,
    ) -> AnswerPipeline {
        let cfg = Config::minimal();
        let mut generation = cfg.generation.clone();
        generation.backoff_secs = 0; // keep tests fast
        let retriever = Retriever::new(
            Arc::new(CorpusStore::new(chunks)),
            Arc::new(DisabledProvider),
            cfg.embedding,
            cfg.retrieval,
        );
        AnswerPipeline::new(retriever, backend, &generation)
    }

    #[tokio::test]
    async fn test_blank_question_short_circuits() {
        let backend = Arc::new(ScriptedBackend::new(vec![ok("should never run")]));
        let pipeline = make_pipeline(support_chunks(), backend.clone());

        assert_eq!(pipeline.answer("   ").await, VALIDATION_MESSAGE);
        assert_eq!(pipeline.answer("").await, VALIDATION_MESSAGE);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_corpus_skips_generation() {
        let backend = Arc::new(ScriptedBackend::new(vec![ok("should never run")]));
        let pipeline = make_pipeline(Vec::new(), backend.clone());

        let answer = pipeline.answer("How do I reset my password?").await;
        assert_eq!(answer, EMPTY_CORPUS_MESSAGE);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_matches_skips_generation() {
        let backend = Arc::new(ScriptedBackend::new(vec![ok("should never run")]));
        let pipeline = make_pipeline(support_chunks(), backend.clone());

        let answer = pipeline.answer("quantum chromodynamics").await;
        assert!(answer.contains("No relevant documents found"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_first_tier_success_returns_trimmed_text() {
        let backend = Arc::new(ScriptedBackend::new(vec![ok(
            "  Use Settings > Security.\n",
        )]));
        let pipeline = make_pipeline(support_chunks(), backend.clone());

        let answer = pipeline.answer("How do I reset my password?").await;
        assert_eq!(answer, "Use Settings > Security.");
        assert_eq!(backend.calls(), vec!["gemini-1.5-flash"]);
    }

    #[tokio::test]
    async fn test_quota_advances_to_next_tier() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            quota(),
            ok("Use Settings > Security."),
        ]));
        let pipeline = make_pipeline(support_chunks(), backend.clone());

        let answer = pipeline.answer("How do I reset my password?").await;
        assert_eq!(answer, "Use Settings > Security.");
        assert_eq!(backend.calls(), vec!["gemini-1.5-flash", "gemini-1.5-pro"]);
    }

    #[tokio::test]
    async fn test_quota_on_all_tiers_falls_back_to_documents() {
        let backend = Arc::new(ScriptedBackend::new(vec![quota(), quota()]));
        let pipeline = make_pipeline(support_chunks(), backend.clone());

        let answer = pipeline.answer("How do I reset my password?").await;
        assert!(answer.starts_with(FALLBACK_NOTICE));
        assert!(answer.contains("security.txt"));
        // Both configured tiers were attempted before falling back
        assert_eq!(backend.calls(), vec!["gemini-1.5-flash", "gemini-1.5-pro"]);
    }

    #[tokio::test]
    async fn test_fallback_lists_best_match_first() {
        let backend = Arc::new(ScriptedBackend::new(vec![quota(), quota()]));
        let pipeline = make_pipeline(support_chunks(), backend);

        let answer = pipeline.answer("How do I reset my password?").await;
        let security_pos = answer.find("security.txt").unwrap();
        // billing.txt scores zero for this query and is absent entirely
        assert!(!answer.contains("billing.txt"));
        assert!(security_pos > FALLBACK_NOTICE.len());
    }

    #[tokio::test]
    async fn test_transient_retries_then_succeeds() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            transient(),
            ok("Billing runs monthly."),
        ]));
        let pipeline = make_pipeline(support_chunks(), backend.clone());

        let answer = pipeline.answer("When does billing run?").await;
        assert_eq!(answer, "Billing runs monthly.");
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_transient_exhaustion_falls_back() {
        let backend = Arc::new(ScriptedBackend::new(vec![transient(), transient()]));
        let pipeline = make_pipeline(support_chunks(), backend.clone());

        let answer = pipeline.answer("When does billing run?").await;
        assert!(answer.starts_with(FALLBACK_NOTICE));
        assert!(answer.contains("billing.txt"));
    }

    #[tokio::test]
    async fn test_empty_response_triggers_retry() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            Err(GenerationError::Empty),
            ok("Billing runs monthly."),
        ]));
        let pipeline = make_pipeline(support_chunks(), backend.clone());

        let answer = pipeline.answer("When does billing run?").await;
        assert_eq!(answer, "Billing runs monthly.");
    }

    #[tokio::test]
    async fn test_idempotent_with_deterministic_backend() {
        let backend_a = Arc::new(ScriptedBackend::new(vec![quota(), quota()]));
        let backend_b = Arc::new(ScriptedBackend::new(vec![quota(), quota()]));
        let pipeline_a = make_pipeline(support_chunks(), backend_a);
        let pipeline_b = make_pipeline(support_chunks(), backend_b);

        let first = pipeline_a.answer("How do I reset my password?").await;
        let second = pipeline_b.answer("How do I reset my password?").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_nonblank_questions_always_answered() {
        for question in ["password", "billing", "nothing relevant here at all"] {
            let backend = Arc::new(ScriptedBackend::new(vec![quota(), quota()]));
            let pipeline = make_pipeline(support_chunks(), backend);
            let answer = pipeline.answer(question).await;
            assert!(!answer.is_empty(), "empty answer for question: {}", question);
        }
    }

    #[test]
    fn test_build_prompt_contains_all_sections() {
        let prompt = build_prompt("From a.txt:\nsome context", "How?");
        assert!(prompt.contains(PROMPT_INSTRUCTIONS));
        assert!(prompt.contains("From a.txt:"));
        assert!(prompt.contains("User Question: How?"));
        assert!(prompt.ends_with("Answer:"));
    }
}
