//! claimcheck HTTP API
//!
//! Axum-based HTTP server that runs the verification pipeline over uploaded
//! documents or raw text.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum dispatch
//! machinery.
//!
//! Endpoints:
//! - GET  /health     : liveness plus the configured model
//! - GET  /version    : server version info
//! - POST /check      : raw document bytes in the body, optional `?name=`
//! - POST /check/text : `{"text": "..."}`

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use claimcheck_core::{
    check_document, ClaimcheckConfig, DocumentLoader, RunOutcome, TracingSink,
    VerificationPipeline,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

pub const NO_CLAIMS_MESSAGE: &str = "No verifiable claims found in the document.";

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub pipeline: Arc<VerificationPipeline>,
    pub loader: Arc<dyn DocumentLoader>,
    pub config: ClaimcheckConfig,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let upload_limit = state.config.http.max_upload_bytes;
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/check", post(check_document_handler))
        .route("/check/text", post(check_text_handler))
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: Arc<HttpState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("claimcheck HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, Default)]
pub struct CheckParams {
    /// Original file name; only its extension is used.
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextCheckRequest {
    pub text: Option<String>,
}

fn error_body(msg: impl Into<String>) -> serde_json::Value {
    serde_json::json!({
        "error": msg.into(),
        "status": "error",
    })
}

// ============================================================================
// Inner (directly testable) functions
// ============================================================================

pub fn health_inner(config: &ClaimcheckConfig) -> (StatusCode, serde_json::Value) {
    (
        StatusCode::OK,
        serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "model": config.llm.model,
        }),
    )
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "claimcheck/1",
    })
}

/// Render a run outcome as the response body.
pub fn outcome_body(outcome: &RunOutcome, preview: Option<&str>, took_ms: u64) -> serde_json::Value {
    let mut body = match outcome {
        RunOutcome::NoClaims {
            run_id,
            extraction_error,
        } => serde_json::json!({
            "status": "no_claims",
            "run_id": run_id,
            "claims_found": 0,
            "message": NO_CLAIMS_MESSAGE,
            "extraction_error": extraction_error,
        }),
        RunOutcome::Verified(report) => serde_json::json!({
            "status": "ok",
            "run_id": report.run_id,
            "claims_found": report.verdicts.len(),
            "report": report,
        }),
    };

    if let Some(obj) = body.as_object_mut() {
        if let Some(preview) = preview {
            obj.insert("preview".to_string(), serde_json::json!(preview));
        }
        obj.insert("took_ms".to_string(), serde_json::json!(took_ms));
    }
    body
}

/// Inner document check: stage the upload, extract text, run the pipeline.
pub async fn check_document_inner(
    state: &HttpState,
    body: &[u8],
    params: CheckParams,
) -> (StatusCode, serde_json::Value) {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, error_body("request body is empty"));
    }
    if body.len() > state.config.http.max_upload_bytes {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            error_body(format!(
                "document exceeds {} bytes",
                state.config.http.max_upload_bytes
            )),
        );
    }

    let start = Instant::now();
    let result = check_document(
        &state.pipeline,
        Arc::clone(&state.loader),
        body,
        params.name.as_deref(),
        &TracingSink,
    )
    .await;
    let took_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(check) => (
            StatusCode::OK,
            outcome_body(&check.outcome, Some(&check.preview), took_ms),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Error processing document");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                error_body(format!("Error processing document: {}", e)),
            )
        }
    }
}

/// Inner text check: run the pipeline on text supplied directly.
pub async fn check_text_inner(
    state: &HttpState,
    req: TextCheckRequest,
) -> (StatusCode, serde_json::Value) {
    let text = match req.text {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                error_body("text field is required"),
            );
        }
    };

    let start = Instant::now();
    let outcome = state.pipeline.run(&text, &TracingSink).await;
    let took_ms = start.elapsed().as_millis() as u64;

    (StatusCode::OK, outcome_body(&outcome, None, took_ms))
}

// ============================================================================
// Axum handler wrappers (thin, delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.config);
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn check_document_handler(
    State(state): State<Arc<HttpState>>,
    Query(params): Query<CheckParams>,
    body: Bytes,
) -> impl IntoResponse {
    let (status, body) = check_document_inner(&state, &body, params).await;
    (status, Json(body))
}

pub async fn check_text_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<TextCheckRequest>,
) -> impl IntoResponse {
    let (status, body) = check_text_inner(&state, req).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
