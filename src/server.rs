//! HTTP query interface over the live catalog snapshot.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/`, `/health` | Status, snapshot timestamp, server count, version |
//! | `GET`  | `/servers?q=&pageSize=&verified=` | Ranked search, `{results, total}` |
//! | `GET`  | `/servers/{id}` | Server detail (exact id, then case-insensitive) |
//! | `POST` | `/admin/reload` | Re-read the catalog file and swap the snapshot |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "server not found: acme" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based clients
//! can query the catalog directly.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use mcp_catalog_core::search::{get_detail, search, SearchPage, SearchRequest, DEFAULT_PAGE_SIZE};
use mcp_catalog_core::snapshot::CatalogHandle;
use mcp_catalog_core::{CatalogDetail, CatalogError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::store;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    catalog: CatalogHandle,
    catalog_path: Arc<PathBuf>,
}

/// Starts the HTTP server on `[server].bind`.
///
/// The catalog file is loaded once at startup; a missing file starts the
/// server with an empty catalog until `POST /admin/reload` succeeds.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let path = config.catalog.path.clone();
    let handle = if path.exists() {
        CatalogHandle::new(store::load_catalog(&path)?)?
    } else {
        warn!(path = %path.display(), "catalog file not found, serving an empty catalog");
        CatalogHandle::empty()
    };

    let bind_addr = config.server.bind.clone();
    let app = router(handle, path);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "catalog server listening");
    println!("Catalog server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router around an existing snapshot handle.
pub fn router(catalog: CatalogHandle, catalog_path: PathBuf) -> Router {
    let state = AppState {
        catalog,
        catalog_path: Arc::new(catalog_path),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_health))
        .route("/health", get(handle_health))
        .route("/servers", get(handle_search))
        .route("/servers/{id}", get(handle_get))
        .route("/admin/reload", post(handle_reload))
        .layer(cors)
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

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => not_found(err.to_string()),
            CatalogError::InvalidRequest(_) => bad_request(err.to_string()),
            other => internal(other.to_string()),
        }
    }
}

// ============ GET / and /health ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: String,
    generated_at: DateTime<Utc>,
    server_count: usize,
    version: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let catalog = state.catalog.current();
    Json(HealthResponse {
        status: "ok".to_string(),
        generated_at: catalog.generated_at,
        server_count: catalog.len(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /servers ============

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(default)]
    page_size: Option<usize>,
    #[serde(default)]
    verified: Option<bool>,
}

async fn handle_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchPage>, AppError> {
    let Query(params) = params.map_err(|e| bad_request(e.body_text()))?;
    let catalog = state.catalog.current();
    let request = SearchRequest {
        query: &params.q,
        verified: params.verified,
        page_size: params.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    };
    Ok(Json(search(&catalog, &request)?))
}

// ============ GET /servers/{id} ============

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CatalogDetail>, AppError> {
    let catalog = state.catalog.current();
    let detail = get_detail(&catalog, &id)?;
    Ok(Json(detail.clone()))
}

// ============ POST /admin/reload ============

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReloadResponse {
    generated_at: DateTime<Utc>,
    server_count: usize,
}

async fn handle_reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, AppError> {
    let path = state.catalog_path.as_ref().clone();
    let catalog = tokio::task::spawn_blocking(move || store::load_catalog(&path))
        .await
        .map_err(|e| internal(e.to_string()))?
        .map_err(|e| internal(format!("{:#}", e)))?;

    let response = ReloadResponse {
        generated_at: catalog.generated_at,
        server_count: catalog.len(),
    };
    state.catalog.replace(catalog)?;
    Ok(Json(response))
}
