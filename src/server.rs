//! JSON HTTP API over [`RagService`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST`   | `/api/chat/query` | Search and answer with citations |
//! | `POST`   | `/api/chat/reindex` | Reindex every document |
//! | `GET`    | `/api/chat/stats` | Corpus totals |
//! | `POST`   | `/api/documents/{id}/index` | Reindex one document |
//! | `DELETE` | `/api/documents/{id}` | Delete a document and its chunks |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "validation error: query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `provider_error` (502),
//! `timeout` (504), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the application's
//! browser front end can call the API directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::RagError;
use crate::models::{QueryResponse, Stats};
use crate::service::RagService;

/// Starts the HTTP server on `[server].bind`. Runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(RagService::open(config).await?);
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "HTTP server listening");
    println!("Listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router. Exposed separately so tests can serve it on an
/// ephemeral port.
pub fn router(service: Arc<RagService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat/query", post(handle_query))
        .route("/api/chat/reindex", post(handle_reindex))
        .route("/api/chat/stats", get(handle_stats))
        .route("/api/documents/{id}/index", post(handle_index_document))
        .route("/api/documents/{id}", delete(handle_delete_document))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(service)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
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

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let (status, code) = match &err {
            RagError::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            RagError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            RagError::Provider { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
            RagError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            RagError::Config(_) | RagError::Storage(_) => {
                tracing::error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/chat/query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

async fn handle_query(
    State(service): State<Arc<RagService>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    Ok(Json(service.query(&req.query, req.limit).await?))
}

// ============ POST /api/chat/reindex ============

#[derive(Serialize)]
struct ReindexResponse {
    message: String,
    processed: usize,
    errors: usize,
}

async fn handle_reindex(
    State(service): State<Arc<RagService>>,
) -> Result<Json<ReindexResponse>, AppError> {
    let summary = service.reindex_all().await?;
    Ok(Json(ReindexResponse {
        message: format!(
            "Reindexed {} documents ({} errors)",
            summary.processed, summary.errors
        ),
        processed: summary.processed,
        errors: summary.errors,
    }))
}

// ============ GET /api/chat/stats ============

async fn handle_stats(State(service): State<Arc<RagService>>) -> Result<Json<Stats>, AppError> {
    Ok(Json(service.stats().await?))
}

// ============ /api/documents/{id} ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexResponse {
    document_id: i64,
    chunks: usize,
}

async fn handle_index_document(
    State(service): State<Arc<RagService>>,
    Path(id): Path<i64>,
) -> Result<Json<IndexResponse>, AppError> {
    let chunks = service.index_document(id).await?;
    Ok(Json(IndexResponse {
        document_id: id,
        chunks,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteResponse {
    document_id: i64,
    deleted: bool,
}

async fn handle_delete_document(
    State(service): State<Arc<RagService>>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, AppError> {
    service.delete_document(id).await?;
    Ok(Json(DeleteResponse {
        document_id: id,
        deleted: true,
    }))
}
