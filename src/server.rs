//! HTTP server for cached media.
//!
//! Serves the local disk under `/storage` and exposes the media locator so
//! page renderers in other processes can resolve stored values without
//! linking this crate.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/media/resolve?path=...` | Resolve a stored media value to a display URL |
//! | `GET`  | `/storage/{*path}` | Static files from the configured local disk |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no URL for /uploads/a.png" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use portal_media_core::locate::MediaLocator;
use portal_media_core::models::MediaSettings;
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::disk::LocalDisk;

#[derive(Clone)]
struct AppState {
    locator: Arc<MediaLocator>,
}

/// Start the server on `[server].bind` and run until the process ends.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let disk = LocalDisk::from_config(config)?;
    let app = router(config.media_settings(), disk);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("portal media server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router over `disk`.
pub fn router(settings: MediaSettings, disk: LocalDisk) -> Router {
    let files = ServeDir::new(disk.root());
    let state = AppState {
        locator: Arc::new(MediaLocator::new(settings, Arc::new(disk))),
    };

    Router::new()
        .route("/health", get(handle_health))
        .route("/media/resolve", get(handle_resolve))
        .nest_service("/storage", files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
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
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!("{:#}", err);
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: err.to_string(),
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

// ============ GET /media/resolve ============

#[derive(Deserialize)]
struct ResolveQuery {
    path: Option<String>,
}

#[derive(Serialize)]
struct ResolveResponse {
    path: String,
    url: String,
    /// `absolute`, `local`, or `remote`.
    kind: &'static str,
}

async fn handle_resolve(
    State(state): State<AppState>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ResolveResponse>, AppError> {
    let path = query.path.unwrap_or_default();
    if path.trim().is_empty() {
        return Err(bad_request("path must not be empty"));
    }

    let resolved = state
        .locator
        .locate(Some(&path))
        .await
        .map_err(internal)?
        .ok_or_else(|| not_found(format!("no URL for {}", path)))?;

    Ok(Json(ResolveResponse {
        kind: resolved.kind(),
        url: resolved.into_url(),
        path,
    }))
}
