//! HTTP answer API.
//!
//! Exposes the answering pipeline as a small JSON API for the external
//! chat frontend and for health monitoring. The pipeline itself never
//! fails a request: `POST /answer` returns 200 with a degraded answer
//! string under quota pressure or backend outages, and diagnostics live
//! behind `GET /status`.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/answer` | Answer a question (`{"question": "..."}`) |
//! | `GET`  | `/status` | Pipeline readiness snapshot |
//! | `GET`  | `/health` | Liveness check (returns version) |
//!
//! # Error Contract
//!
//! Malformed requests produce a JSON error body:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must be a string" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based chat clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::assistant::Assistant;
use crate::config::Config;
use crate::status::PipelineStatus;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    assistant: Arc<Assistant>,
}

/// Start the answer API server.
///
/// Assembles the pipeline (loading the corpus once), binds to the
/// address configured in `[server].bind`, and serves until the process
/// is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let assistant = Arc::new(Assistant::initialize(config).await?);
    let bind_addr = config.server.bind.clone();

    let state = AppState { assistant };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/answer", post(handle_answer))
        .route("/status", get(handle_status))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    tracing::info!("answer API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ POST /answer ============

#[derive(Deserialize)]
struct AnswerRequest {
    question: String,
}

#[derive(Serialize)]
struct AnswerResponse {
    answer: String,
}

/// Handler for `POST /answer`.
///
/// Always returns 200 with an answer string for a well-formed request;
/// validation of blank questions happens inside the pipeline and comes
/// back as a user-facing message, never as an HTTP error.
async fn handle_answer(
    State(state): State<AppState>,
    payload: Result<Json<AnswerRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Json<AnswerResponse>, AppError> {
    let Json(request) = payload.map_err(|e| bad_request(e.to_string()))?;
    let answer = state.assistant.answer(&request.question).await;
    Ok(Json(AnswerResponse { answer }))
}

// ============ GET /status ============

/// Handler for `GET /status`.
///
/// Returns the pipeline readiness snapshot for monitoring and for the
/// frontend's status sidebar.
async fn handle_status(State(state): State<AppState>) -> Json<PipelineStatus> {
    Json(state.assistant.status())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`.
///
/// Used by load balancers and monitoring tools.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
