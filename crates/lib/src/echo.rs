//! Local echo webhook for trying the widget without an external endpoint.
//!
//! `POST /` answers chat messages with `{"reply": "You said: ..."}` and accepts
//! transcripts with `{"ok": true}`. `GET /health` reports the server is running.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Transcript body; recognised by `"type": "transcript"`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptRequest {
    transcript: String,
    #[serde(default)]
    session_id: Option<String>,
}

/// Chat message body.
#[derive(Debug, Deserialize)]
struct MessageRequest {
    message: String,
}

#[derive(Default)]
struct EchoState {
    messages: AtomicU64,
    transcripts: AtomicU64,
}

/// Router for the echo webhook; exposed so tests can serve it on their own listener.
pub fn router() -> Router {
    Router::new()
        .route("/", post(handle_post))
        .route("/health", get(handle_health))
        .with_state(Arc::new(EchoState::default()))
}

async fn handle_health(State(state): State<Arc<EchoState>>) -> Json<Value> {
    Json(json!({
        "runtime": "running",
        "messages": state.messages.load(Ordering::Relaxed),
        "transcripts": state.transcripts.load(Ordering::Relaxed),
    }))
}

async fn handle_post(
    State(state): State<Arc<EchoState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let is_transcript = body.get("type").and_then(|t| t.as_str()) == Some("transcript");
    if is_transcript {
        if let Ok(req) = serde_json::from_value::<TranscriptRequest>(body) {
            state.transcripts.fetch_add(1, Ordering::Relaxed);
            log::info!(
                "echo webhook: transcript {} ({} bytes)",
                req.session_id.as_deref().unwrap_or("-"),
                req.transcript.len()
            );
            return (StatusCode::OK, Json(json!({ "ok": true })));
        }
    } else if let Ok(req) = serde_json::from_value::<MessageRequest>(body) {
        state.messages.fetch_add(1, Ordering::Relaxed);
        log::info!("echo webhook: message ({} bytes)", req.message.len());
        return (
            StatusCode::OK,
            Json(json!({ "reply": format!("You said: {}", req.message) })),
        );
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "expected {\"message\"} or {\"type\":\"transcript\"}" })),
    )
}

/// Serve the echo webhook on `addr` until Ctrl+C.
pub async fn run_echo_webhook(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding echo webhook to {}", addr))?;
    log::info!("echo webhook listening on http://{}/", addr);
    axum::serve(listener, router())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("echo webhook server exited")?;
    log::info!("echo webhook stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("shutdown signal received");
}
