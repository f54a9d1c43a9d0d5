//! HTTP boundary.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/upload` | Multipart field `file`, returns cleaned rows or `{ "message": ... }` |
//! | `GET` | `/health` | Liveness probe |
use std::future::Future;
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::ServerConfig;
use crate::{ingest_upload, receive_upload, IngestError, UploadedFile};

/// Shared, read-only state for every handler.
pub type AppState = Arc<ServerConfig>;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
}

impl IngestError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::NoFile
            | IngestError::NotCsv
            | IngestError::MissingColumns { .. }
            | IngestError::Empty => StatusCode::BAD_REQUEST,
            IngestError::Multipart(e) => e.status(),
            IngestError::Parse(_) | IngestError::Io(_) | IngestError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "upload failed");
        } else {
            warn!(%status, error = %self, "upload rejected");
        }
        (status, Json(ErrorResponse { message: self.to_string() })).into_response()
    }
}

/// Routes with CORS open to any origin. The body limit comes from
/// `max_upload_bytes`; unset disables axum's default cap.
pub fn build_router(config: ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = match config.max_upload_bytes {
        Some(max) => DefaultBodyLimit::max(max),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/upload", post(upload))
        .route("/health", get(health))
        .layer(body_limit)
        .layer(cors)
        .with_state(Arc::new(config))
}

/// Bind, serve until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let listener = TcpListener::bind(config.bind).await?;
    info!(
        addr = %listener.local_addr()?,
        upload_dir = %config.upload_dir.display(),
        validation = ?config.ingest.validation,
        "server running"
    );

    axum::serve(listener, build_router(config))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("server stopped");
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// `POST /upload`
async fn upload(
    State(config): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    // a body that is not multipart at all carries no file either
    let Ok(mut multipart) = multipart else {
        return IngestError::NoFile.into_response();
    };

    let upload = match receive_upload(&mut multipart, &config.upload_dir).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return IngestError::NoFile.into_response(),
        Err(e) => return e.into_response(),
    };

    let span = info_span!("upload", id = %upload.id, file = %upload.original_name);
    respond(upload, &config).instrument(span).await
}

async fn respond(upload: UploadedFile, config: &ServerConfig) -> Response {
    if !upload.has_csv_extension() {
        upload.discard().await;
        return IngestError::NotCsv.into_response();
    }

    match ingest_upload(upload, &config.ingest).await {
        Ok(rows) => {
            info!(rows = rows.len(), "upload accepted");
            Json(rows).into_response()
        }
        Err(e) => e.into_response(),
    }
}
