//! # docanswer CLI (`dqa`)
//!
//! The `dqa` binary is the primary interface to the answering pipeline.
//! It provides commands for asking single questions, running a chat
//! session, document-only search, readiness reporting, and starting the
//! HTTP answer API.
//!
//! ## Usage
//!
//! ```bash
//! dqa --config ./config/dqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dqa ask "<question>"` | Answer one question |
//! | `dqa chat` | Interactive chat session |
//! | `dqa search "<query>"` | Document-only search listing (no generation) |
//! | `dqa status` | Print the pipeline readiness snapshot as JSON |
//! | `dqa serve` | Start the HTTP answer API |
//!
//! ## Examples
//!
//! ```bash
//! # Answer a question against the configured corpus
//! dqa ask "How do I reset my password?" --config ./config/dqa.toml
//!
//! # Inspect what the retriever alone would return
//! dqa search "password reset" --limit 5
//!
//! # Check readiness before wiring up the frontend
//! dqa status
//!
//! # Serve the JSON API for the chat frontend
//! dqa serve --config ./config/dqa.toml
//! ```

mod answer;
mod assistant;
mod chunk;
mod config;
mod corpus;
mod embedding;
mod generation;
mod ingest;
mod models;
mod retriever;
mod server;
mod session;
mod status;

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::AsyncBufReadExt;

use crate::assistant::Assistant;
use crate::session::SessionHistory;

/// docanswer CLI — a retrieval-grounded question answering pipeline for
/// support document corpora.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; commands fall back to built-in defaults when the file is absent.
#[derive(Parser)]
#[command(
    name = "dqa",
    about = "docanswer — retrieval-grounded question answering for support documents",
    version,
    long_about = "docanswer retrieves relevant passages from a corpus of support documents \
    and produces grounded answers through a tiered set of generative models, falling back \
    to a keyword-ranked document listing when generation is unavailable or out of quota."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Answer a single question.
    ///
    /// Retrieves grounding context, asks the configured model tiers, and
    /// prints the answer. Degrades to a document listing when every
    /// generation attempt fails.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Run an interactive chat session.
    ///
    /// Reads questions from stdin until EOF or `exit`. Each turn is
    /// independent; the transcript is kept only for display.
    Chat,

    /// Search the corpus without invoking generation.
    ///
    /// Prints the same ranked document listing the fallback path uses.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Print the pipeline readiness snapshot as JSON.
    ///
    /// Reports credential presence, corpus state, document count, and
    /// the active retrieval mode. Works without a generation credential.
    Status,

    /// Start the HTTP answer API.
    ///
    /// Binds to the address configured in `[server].bind` and exposes
    /// `POST /answer`, `GET /status`, and `GET /health`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        config::Config::minimal()
    };

    match cli.command {
        Commands::Ask { question } => {
            let assistant = Assistant::initialize(&cfg).await?;
            println!("{}", assistant.answer(&question).await);
        }
        Commands::Chat => {
            run_chat(&cfg).await?;
        }
        Commands::Search { query, limit } => {
            // Document-only search needs no generation credential
            let listing = status_free_search(&cfg, &query, limit).await?;
            println!("{}", listing);
        }
        Commands::Status => {
            let snapshot = status::probe_from_config(&cfg).await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

/// Interactive chat loop over stdin/stdout.
async fn run_chat(cfg: &config::Config) -> anyhow::Result<()> {
    let assistant = Assistant::initialize(cfg).await?;
    let mut history = SessionHistory::new();

    println!("docanswer chat — ask about your documents (exit to quit)");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        history.record_user(question);
        let answer = assistant.answer(question).await;
        history.record_assistant(answer.clone());
        println!("{}\n", answer);
    }

    println!("Session ended after {} turn(s).", history.len());
    Ok(())
}

/// Run a document-only search without constructing the generation
/// backend, so `dqa search` works with no credential configured.
async fn status_free_search(
    cfg: &config::Config,
    query: &str,
    limit: Option<usize>,
) -> anyhow::Result<String> {
    use crate::embedding::{create_provider, DisabledProvider, EmbeddingProvider};
    use crate::ingest::CorpusHandle;
    use crate::retriever::Retriever;
    use std::sync::Arc;

    let provider: Arc<dyn EmbeddingProvider> = match create_provider(&cfg.embedding) {
        Ok(p) => Arc::from(p),
        Err(_) => Arc::new(DisabledProvider),
    };

    let handle = CorpusHandle::new();
    let corpus = handle.get_or_load(cfg, provider.as_ref()).await;

    let retriever = Retriever::new(
        corpus,
        provider,
        cfg.embedding.clone(),
        cfg.retrieval.clone(),
    );

    let limit = limit.unwrap_or_else(|| retriever.default_limit());
    let results = retriever.retrieve(query, limit).await;
    Ok(retriever.format_for_display(query, &results))
}
