//! SNoP relay HTTP API
//!
//! Axum-based HTTP server that sits between the embedded chat widget and the
//! text-to-SQL backend. Every endpoint forwards one request upstream and
//! reshapes only headers and error bodies; success payloads pass through
//! unchanged, spreadsheet bytes included.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function. The inner functions are directly testable without axum
//! dispatch machinery.
//!
//! Endpoints:
//! - `GET /health`: relay status plus upstream status
//! - `GET /version`: relay version info
//! - `POST /api/chat`: ask a question
//! - `GET /api/chat/history/{sessionId}`: read session history (never cached)
//! - `DELETE /api/chat/history/{sessionId}`: clear session history
//! - `POST /api/download/xlsx`: export query results as a workbook
//! - `POST /api/download/csv`: export query results as CSV

use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use snop_core::models::{ChatRequest, DownloadRequest, ErrorEnvelope, ExportFormat};
use snop_core::{BackendClient, RelayError, SnopConfig};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    pub backend: BackendClient,
    pub config: SnopConfig,
}

impl HttpState {
    pub fn new(config: SnopConfig) -> Result<Self, RelayError> {
        let backend = BackendClient::new(&config.backend)?;
        Ok(Self { backend, config })
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let cors = cors_layer(&state.config.http.cors_origins);

    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/api/chat", post(chat_handler))
        .route(
            "/api/chat/history",
            get(missing_session_handler).delete(missing_session_handler),
        )
        .route(
            "/api/chat/history/",
            get(missing_session_handler).delete(missing_session_handler),
        )
        .route(
            "/api/chat/history/:session_id",
            get(history_handler).delete(delete_history_handler),
        )
        .route("/api/download/xlsx", post(download_xlsx_handler))
        .route("/api/download/csv", post(download_csv_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    config: SnopConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.http.host, config.http.port);
    let state = Arc::new(HttpState::new(config)?);
    let upstream = state.backend.base_url().to_string();

    let app = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("SNoP relay listening on http://{} (upstream {})", addr, upstream);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

/// Allow the configured widget origins, or any origin when none are listed.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if parsed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(parsed)
    }
}

// ============================================================================
// Error envelope
// ============================================================================

/// Relay operations, each with its own user-facing failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Chat,
    LoadHistory,
    DeleteHistory,
    Download,
}

impl Operation {
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::Chat => "An error occurred while processing the chat request.",
            Operation::LoadHistory => "An error occurred while loading the chat history.",
            Operation::DeleteHistory => "An error occurred while deleting the chat history.",
            Operation::Download => "An error occurred while downloading the file.",
        }
    }
}

/// Map a relay failure to its HTTP status and `{error, detail}` body.
/// Validation failures are 400 with the validation message as `error`;
/// backend and transport failures are 500.
pub fn error_response(op: Operation, err: &RelayError) -> (StatusCode, Value) {
    let (status, envelope) = match err {
        RelayError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorEnvelope::new(msg.clone())),
        RelayError::Backend { .. } | RelayError::Transport(_) => {
            tracing::error!("{:?} relay failed: {}", op, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorEnvelope::with_detail(op.failure_message(), err.to_string()),
            )
        }
    };
    (status, serde_json::to_value(envelope).unwrap_or_default())
}

// ============================================================================
// Inner (directly testable) relay functions
// ============================================================================

/// Inner health check: pings the upstream and reports (status_code, json_body).
pub async fn health_inner(backend: &BackendClient) -> (StatusCode, Value) {
    match backend.health().await {
        Ok(upstream) => (
            StatusCode::OK,
            json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "backend": backend.base_url(),
                "backend_status": upstream.get("status").cloned().unwrap_or(Value::Null),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({
                "status": "degraded",
                "version": env!("CARGO_PKG_VERSION"),
                "backend": backend.base_url(),
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version: returns version info (pure, no IO).
pub fn version_inner() -> Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "snop-relay/1",
    })
}

/// Inner chat: forwards the question and passes the answer through as-is.
pub async fn chat_inner(backend: &BackendClient, req: ChatRequest) -> (StatusCode, Value) {
    match backend.post_chat::<Value>(&req).await {
        Ok(answer) => (StatusCode::OK, answer),
        Err(e) => error_response(Operation::Chat, &e),
    }
}

/// Inner history read: `{messages: [...]}` straight from the backend.
pub async fn history_inner(backend: &BackendClient, session_id: &str) -> (StatusCode, Value) {
    match backend.get_history::<Value>(session_id).await {
        Ok(history) => (StatusCode::OK, history),
        Err(e) => error_response(Operation::LoadHistory, &e),
    }
}

/// Inner history delete: returns the backend's acknowledgement body.
pub async fn delete_history_inner(
    backend: &BackendClient,
    session_id: &str,
) -> (StatusCode, Value) {
    match backend.delete_history::<Value>(session_id).await {
        Ok(ack) => (StatusCode::OK, ack),
        Err(e) => error_response(Operation::DeleteHistory, &e),
    }
}

/// Inner download: streams the backend's bytes back with an attachment
/// filename for today. The format always follows the route.
pub async fn download_inner(
    backend: &BackendClient,
    mut req: DownloadRequest,
    format: ExportFormat,
) -> Response {
    req.format = format;

    match backend.download(&req).await {
        Ok(upstream) => {
            let filename = format.filename_today();
            tracing::info!("Relaying {} export as {}", format.as_str(), filename);
            let disposition = format!("attachment; filename=\"{}\"", filename);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, format.content_type().to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                Body::from_stream(upstream.bytes_stream()),
            )
                .into_response()
        }
        Err(e) => {
            let (status, body) = error_response(Operation::Download, &e);
            (status, Json(body)).into_response()
        }
    }
}

// ============================================================================
// Axum handler wrappers (thin: delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(&state.backend).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn chat_handler(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(Json(req)) => chat_inner(&state.backend, req).await,
        Err(rejection) => invalid_body(Operation::Chat, rejection),
    };
    (status, Json(body))
}

pub async fn history_handler(
    State(state): State<Arc<HttpState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = history_inner(&state.backend, &session_id).await;
    (status, no_store(), Json(body))
}

pub async fn delete_history_handler(
    State(state): State<Arc<HttpState>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let (status, body) = delete_history_inner(&state.backend, &session_id).await;
    (status, no_store(), Json(body))
}

/// `/api/chat/history` with no id segment at all.
pub async fn missing_session_handler() -> impl IntoResponse {
    let (status, body) = error_response(
        Operation::LoadHistory,
        &RelayError::Validation("sessionId is required".to_string()),
    );
    (status, Json(body))
}

pub async fn download_xlsx_handler(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    download_with(&state, payload, ExportFormat::Xlsx).await
}

pub async fn download_csv_handler(
    State(state): State<Arc<HttpState>>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Response {
    download_with(&state, payload, ExportFormat::Csv).await
}

async fn download_with(
    state: &HttpState,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
    format: ExportFormat,
) -> Response {
    match payload {
        Ok(Json(req)) => download_inner(&state.backend, req, format).await,
        Err(rejection) => {
            let (status, body) = invalid_body(Operation::Download, rejection);
            (status, Json(body)).into_response()
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn invalid_body(op: Operation, rejection: JsonRejection) -> (StatusCode, Value) {
    error_response(
        op,
        &RelayError::Validation(format!("invalid request body: {}", rejection.body_text())),
    )
}

fn no_store() -> [(header::HeaderName, &'static str); 1] {
    [(header::CACHE_CONTROL, "no-store")]
}

// ============================================================================
// Unit Tests: call inner functions directly
// ============================================================================
