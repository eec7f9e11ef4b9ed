//! OpenAI-compatible HTTP API.
//!
//! Implements the subset of the OpenAI API the mock exposes:
//! - POST /v1/chat/completions
//! - GET /v1/models
//! - GET /health
//!
//! No authentication, no rate limiting; requests naming models outside the
//! catalog succeed anyway (the mock never validates model existence).

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{Config, ModelEntry};
use crate::mock::emitter::sse_stream;
use crate::mock::selector::{select, ChatCompletionRequest, Reply};

/// Application state shared across handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub start_time: Instant,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("malformed request body: {0}")]
    MalformedRequest(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    kind: String,
    code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self, "Rejecting request");
        let (status, code) = match &self {
            ApiError::MalformedRequest(_) => (StatusCode::BAD_REQUEST, "malformed_request"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                message: self.to_string(),
                kind: "invalid_request_error".to_string(),
                code: code.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/models", get(list_models))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─── Response Types ────────────────────────────────────────────────────────

/// Model listing response.
#[derive(Debug, Serialize)]
pub struct ModelList {
    pub object: String,
    pub data: Vec<ModelEntry>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

// ─── Route Handlers ────────────────────────────────────────────────────────

async fn chat_completions(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    // Parse the body ourselves so a bad payload becomes a 400 JSON error
    // instead of a silent default.
    let request: ChatCompletionRequest = serde_json::from_slice(&body)?;

    info!(
        model = request.model.as_deref().unwrap_or("<default>"),
        messages = request.messages.len(),
        stream = request.stream,
        "Chat completion request"
    );

    match select(&request, &state.config.mock) {
        Reply::Completion(completion) => Ok(Json(completion).into_response()),
        Reply::Stream(spec) => {
            let delay = Duration::from_millis(state.config.mock.stream_delay_ms);
            let stream = sse_stream(spec, delay);
            Ok(Sse::new(stream)
                .keep_alive(KeepAlive::default())
                .into_response())
        }
    }
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelList> {
    Json(ModelList {
        object: "list".to_string(),
        data: state.config.catalog.clone(),
    })
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
