//! # docanswer
//!
//! A retrieval-grounded question answering pipeline for support document
//! corpora.
//!
//! docanswer loads a fixed corpus of plain-text support documents,
//! retrieves the passages most relevant to an incoming question (semantic
//! ranking when an embedding provider is configured, keyword scoring
//! otherwise), and asks a prioritized ladder of generative models for a
//! grounded answer. When every generation attempt is exhausted — quota
//! pressure being the dominant operational failure mode — it returns a
//! formatted document listing instead, so the caller always receives a
//! useful string and never an error.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────────┐
//! │  Docs    │──▶│  Ingest    │──▶│   CorpusStore    │
//! │ (*.txt)  │   │ chunk+embed│   │ (immutable, RAM) │
//! └──────────┘   └───────────┘   └───────┬─────────┘
//!                                        │
//!                               ┌────────▼────────┐
//!                  question ──▶ │  AnswerPipeline  │──▶ answer
//!                               │ retrieve → prompt│
//!                               │ → tiers → fall-  │
//!                               │   back listing   │
//!                               └────────┬────────┘
//!                      ┌─────────────────┤
//!                      ▼                 ▼
//!                 ┌─────────┐      ┌──────────┐
//!                 │   CLI   │      │   HTTP    │
//!                 │  (dqa)  │      │ (answer)  │
//!                 └─────────┘      └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Paragraph-boundary text chunking |
//! | [`ingest`] | One-time corpus load from the docs directory |
//! | [`corpus`] | Immutable corpus store with keyword and semantic ranking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`retriever`] | Retrieval policy and result formatting |
//! | [`generation`] | Generation backend with typed failure taxonomy |
//! | [`answer`] | The answer orchestrator |
//! | [`assistant`] | Application assembly |
//! | [`status`] | Readiness probes |
//! | [`session`] | Chat transcript record |
//! | [`server`] | HTTP answer API |

pub mod answer;
pub mod assistant;
pub mod chunk;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod generation;
pub mod ingest;
pub mod models;
pub mod retriever;
pub mod server;
pub mod session;
pub mod status;
