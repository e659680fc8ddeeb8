//! HTTP server implementation
//!
//! Implements:
//! - Download endpoint (GET /download/{token}) streaming stored files
//! - Health check (GET /health) with registry stats
//! - Service banner (GET /)
//!
//! Download links are single-purpose and unauthenticated; the token itself
//! is the capability. Responses carry `Cache-Control: no-store` so expired
//! links do not linger in intermediary caches.

use std::io::ErrorKind;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::links::LinkRegistry;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Link registry backing /download and /health.
    pub registry: Arc<LinkRegistry>,
    /// Server start time (Unix seconds) for uptime reporting.
    pub start_time: i64,
}

/// Build the relay router with handler state attached.
pub fn create_router(registry: Arc<LinkRegistry>) -> Router {
    let state = AppState {
        registry,
        start_time: chrono::Utc::now().timestamp(),
    };

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/download/{token}", get(download_handler))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - Service banner.
async fn root_handler() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
        .into_response()
}

/// GET /health - Liveness probe with registry stats.
async fn health_handler(State(state): State<AppState>) -> Response {
    let now = chrono::Utc::now();
    let uptime = now.timestamp() - state.start_time;
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "recordCount": state.registry.len(),
            "timestamp": now.to_rfc3339(),
            "uptimeSeconds": uptime,
        })),
    )
        .into_response()
}

/// GET /download/{token} - Stream a stored file to the caller.
///
/// Unknown and expired tokens get the same 404 body. A record whose backing
/// file has gone missing is dropped from the registry before the 404 is
/// returned, so the registry never keeps pointing at nothing.
async fn download_handler(State(state): State<AppState>, Path(token): Path<String>) -> Response {
    let Some(record) = state.registry.resolve(&token) else {
        debug!(token = %token, "download requested for unknown or expired token");
        return not_found_response();
    };

    let file = match tokio::fs::File::open(&record.storage_path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(
                token = %token,
                path = %record.storage_path.display(),
                "stored file missing, dropping link record"
            );
            state.registry.remove(&token);
            return not_found_response();
        }
        Err(e) => {
            warn!(
                token = %token,
                path = %record.storage_path.display(),
                error = %e,
                "failed to open stored file"
            );
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "read_failed",
                    "message": "could not read the stored file",
                })),
            )
                .into_response();
        }
    };

    debug!(
        token = %token,
        name = %record.display_name,
        size = record.size_bytes,
        "serving download"
    );

    // Stream from disk; the file is never buffered whole in memory.
    let body = Body::from_stream(ReaderStream::new(file));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, record.size_bytes.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", record.display_name),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        body,
    )
        .into_response()
}

/// 404 body shared by the unknown-token and missing-file paths. Expired and
/// never-issued tokens are indistinguishable to the caller.
fn not_found_response() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "message": "link not found or expired",
        })),
    )
        .into_response()
}
