//! HTTP API
//!
//! `GET /health` and `POST /chat` in front of whichever runner the
//! configuration selected. Runs are serialized: the stores behind a runner
//! are files, so one request executes at a time.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::agent::Runner;
use crate::Result;

/// Longest accepted prompt, in characters.
pub const MAX_PROMPT_CHARS: usize = 4000;

pub struct AppState {
    runner: Arc<dyn Runner>,
    run_lock: Mutex<()>,
    mode: String,
    model: String,
}

impl AppState {
    pub fn new(runner: Arc<dyn Runner>, mode: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            runner,
            run_lock: Mutex::new(()),
            mode: mode.into(),
            model: model.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub mode: String,
    pub model: String,
}

/// Error body: `{"detail": "..."}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    fn unprocessable(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .with_state(state)
}

// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        mode: state.mode.clone(),
        model: state.model.clone(),
    })
}

// POST /chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> std::result::Result<Json<ChatResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| ApiError::unprocessable(rejection.body_text()))?;

    let length = request.prompt.chars().count();
    if length == 0 || length > MAX_PROMPT_CHARS {
        return Err(ApiError::unprocessable(format!(
            "Prompt must be between 1 and {MAX_PROMPT_CHARS} characters."
        )));
    }

    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::unprocessable("Prompt must not be empty."));
    }

    info!(prompt_chars = prompt.chars().count(), mode = %state.mode, "/chat request received");

    let result = {
        let _guard = state.run_lock.lock().await;
        state.runner.run(prompt).await
    };

    match result {
        Ok(response) => {
            info!(response_chars = response.chars().count(), "/chat request completed");
            Ok(Json(ChatResponse {
                response,
                mode: state.mode.clone(),
            }))
        }
        Err(e) => {
            error!(error = %e, "Chat request failed");
            Err(ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                detail: format!("Agent execution failed: {e}"),
            })
        }
    }
}

/// Bind `host:port` and serve until the process exits.
pub async fn serve(host: &str, port: u16, state: Arc<AppState>) -> Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
