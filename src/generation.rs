//! Generation backend abstraction with typed failure classification.
//!
//! The generative model is an external capability reached over HTTP. This
//! module adapts it to a single uniform contract: [`GenerationBackend`]
//! takes a prompt and an explicit model id and returns a normalized
//! [`GenerationResult`] or a typed [`GenerationError`].
//!
//! Backend-specific failure shapes — HTTP statuses, error body text,
//! quota markers — are classified **once**, here at the boundary. The
//! orchestrator only ever branches on the typed variants; no retry is
//! performed inside the backend, and no "current model" state is held:
//! tier selection is passed per call.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::GenerationConfig;
use crate::models::GenerationResult;

/// Default endpoint for the Gemini-style `generateContent` API.
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Substrings that identify quota/rate-limit failures in backend error
/// text. Backend-version-fragile on purpose: they live only here, next to
/// the HTTP adaptation, never in the orchestrator.
const QUOTA_MARKERS: &[&str] = &[
    "quota",
    "rate limit",
    "429",
    "resource_exhausted",
    "too many requests",
    "limit exceeded",
];

/// Failure taxonomy of one generation attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Rate limit or resource exhaustion reported by the backend.
    /// Recovered by advancing to the next model tier after a backoff.
    #[error("generation quota exhausted: {message}")]
    Quota { message: String },

    /// Network failure, server error, timeout, or malformed response.
    /// Recovered by retrying while attempts remain.
    #[error("generation failed: {message}")]
    Transient { message: String },

    /// The backend reported success but returned no usable text.
    /// Treated as a soft failure, not an exception.
    #[error("generation returned no text")]
    Empty,
}

/// Classify a backend failure message into the typed taxonomy.
pub fn classify_failure(message: &str) -> GenerationError {
    let lower = message.to_lowercase();
    if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) {
        GenerationError::Quota {
            message: message.to_string(),
        }
    } else {
        GenerationError::Transient {
            message: message.to_string(),
        }
    }
}

/// Uniform contract for generative model endpoints.
///
/// Implementations must be stateless with respect to model selection and
/// perform no internal retries — retry and tier policy belong to the
/// orchestrator.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Run one generation attempt against the named model.
    async fn generate(&self, prompt: &str, model: &str)
        -> Result<GenerationResult, GenerationError>;
}

/// HTTP backend for a Gemini-style `models/{model}:generateContent` API.
///
/// The credential is resolved once at construction; a missing credential
/// is a hard startup failure, surfaced distinctly from runtime quota
/// errors.
pub struct HttpGenerationBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    temperature: f64,
    max_output_tokens: u32,
}

impl HttpGenerationBackend {
    /// Build the backend from configuration, resolving the API key from
    /// the `GOOGLE_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Fails when the credential is absent or the HTTP client cannot be
    /// constructed. Callers must not construct the answering pipeline
    /// without a credentialed backend.
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| anyhow::anyhow!("GOOGLE_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
    ) -> Result<GenerationResult, GenerationError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, model, self.api_key
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
            },
        });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transient {
                message: e.to_string(),
            })?;

        let status = response.status();

        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(classify_failure(&format!("{}: {}", status, body_text)));
        }

        let json: serde_json::Value =
            response.json().await.map_err(|e| GenerationError::Transient {
                message: format!("invalid response body: {}", e),
            })?;

        parse_generation_response(&json)
    }
}

/// Adapt the `generateContent` response shape into a [`GenerationResult`].
///
/// Extracts `candidates[0].content.parts[].text`; a success response
/// carrying no text maps to [`GenerationError::Empty`], any structural
/// deviation to [`GenerationError::Transient`].
fn parse_generation_response(
    json: &serde_json::Value,
) -> Result<GenerationResult, GenerationError> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or_else(|| GenerationError::Transient {
            message: "invalid response: missing candidates".to_string(),
        })?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(GenerationError::Empty);
    }

    Ok(GenerationResult { text })
}
