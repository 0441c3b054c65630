use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::ModelTier;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    /// Directory scanned for plain-text support documents.
    pub docs_dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("./docs"),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.txt".to_string(), "**/*.md".to_string()]
}
fn default_max_chunk_chars() -> usize {
    2000
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Chunks retrieved per question.
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Snippet window for the document-fallback listing.
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,
    /// Per-chunk cap when building the grounding prompt.
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            snippet_chars: default_snippet_chars(),
            context_chars: default_context_chars(),
        }
    }
}

fn default_limit() -> usize {
    3
}
fn default_snippet_chars() -> usize {
    300
}
fn default_context_chars() -> usize {
    800
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Model tiers in fallback order, priorities strictly increasing.
    #[serde(default = "default_tiers")]
    pub tiers: Vec<ModelTier>,
    /// Total generation attempts per question. Defaults to the tier
    /// count, with a floor of 2 (one retry of the last tier).
    #[serde(default)]
    pub max_attempts: Option<usize>,
    /// Pause before advancing tiers after a quota failure.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Override the generateContent endpoint base URL.
    #[serde(default)]
    pub api_base: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            max_attempts: None,
            backoff_secs: default_backoff_secs(),
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            api_base: None,
        }
    }
}

fn default_tiers() -> Vec<ModelTier> {
    vec![
        ModelTier {
            model: "gemini-1.5-flash".to_string(),
            priority: 1,
        },
        ModelTier {
            model: "gemini-1.5-pro".to_string(),
            priority: 2,
        },
    ]
}
fn default_backoff_secs() -> u64 {
    2
}
fn default_temperature() -> f64 {
    0.1
}
fn default_max_output_tokens() -> u32 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7431".to_string(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl GenerationConfig {
    /// Effective attempt budget: configured value, or tier count with a
    /// floor of two.
    pub fn effective_max_attempts(&self) -> usize {
        self.max_attempts.unwrap_or_else(|| self.tiers.len().max(2))
    }
}

impl Config {
    /// A default configuration for tests and config-less commands.
    pub fn minimal() -> Self {
        Self {
            corpus: CorpusConfig::default(),
            retrieval: RetrievalConfig::default(),
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.retrieval.limit < 1 {
        anyhow::bail!("retrieval.limit must be >= 1");
    }

    if config.corpus.max_chunk_chars == 0 {
        anyhow::bail!("corpus.max_chunk_chars must be > 0");
    }

    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.generation.tiers.is_empty() {
        anyhow::bail!("generation.tiers must not be empty");
    }

    let priorities: Vec<u32> = config.generation.tiers.iter().map(|t| t.priority).collect();
    if priorities.windows(2).any(|w| w[0] >= w[1]) {
        anyhow::bail!("generation.tiers priorities must be strictly increasing");
    }

    if config.generation.max_attempts == Some(0) {
        anyhow::bail!("generation.max_attempts must be >= 1 when set");
    }

    if !(0.0..=2.0).contains(&config.generation.temperature) {
        anyhow::bail!("generation.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}
