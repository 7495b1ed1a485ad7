//! HTTP REST API over the sync layer.
//!
//! # Endpoints
//!
//! | Method | Path | Auth | Description |
//! |--------|------|------|-------------|
//! | `GET` | `/health` | — | Health check (returns version) |
//! | `GET` | `/lore/search` | — | Semantic search (`q`, `category`, `limit`) |
//! | `GET` | `/lore` | — | List entries (`category`, `full`) |
//! | `GET` | `/lore/categories` | — | Sorted distinct categories |
//! | `GET` | `/lore/{id}` | — | Single entry, 404 when missing |
//! | `POST` | `/lore` | key | Create entry |
//! | `PATCH` | `/lore/{id}` | key | Partial update, 404 when missing |
//! | `DELETE` | `/lore/{id}` | key | Delete, 404 when missing |
//!
//! Mutating routes require the `x-api-key` header to match the configured
//! key; a missing or wrong key gets a 401. Error responses share one
//! shape:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "entry not found: …" } }
//! ```
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the static-site
//! build and browser clients can call the read endpoints directly.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::error::LoreError;
use crate::models::{EntryPatch, NewEntry};
use crate::store::EntryStore;
use crate::sync::LoreSync;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<LoreSync>,
    /// When `None`, mutating routes are rejected outright — running
    /// without a key is a misconfiguration, not an open door.
    pub api_key: Option<String>,
}

/// Build the router. Split out from [`run_server`] so tests can drive the
/// routes without binding a socket.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/lore", get(handle_list).post(handle_create))
        .route("/lore/search", get(handle_search))
        .route("/lore/categories", get(handle_categories))
        .route(
            "/lore/{id}",
            get(handle_get).patch(handle_update).delete(handle_delete),
        )
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    info!(addr = bind_addr, "lore server listening");
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
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

/// Internal error type that converts into an HTTP response.
struct ApiError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
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

fn not_found(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn unauthorized(message: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::UNAUTHORIZED,
        code: "unauthorized".to_string(),
        message: message.into(),
    }
}

impl From<LoreError> for ApiError {
    fn from(err: LoreError) -> Self {
        let (status, code) = match &err {
            LoreError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            LoreError::Embedding(_) => (StatusCode::INTERNAL_SERVER_ERROR, "embedding_failed"),
            // The entry write went through; the id in the message lets an
            // operator retry indexing.
            LoreError::IndexSync { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "index_sync"),
            LoreError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        ApiError {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

/// API-key check for mutating routes.
fn require_api_key(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.api_key.as_deref() else {
        return Err(unauthorized("no API key configured; mutations disabled"));
    };
    let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    match provided {
        Some(key) if key == expected => Ok(()),
        Some(_) => Err(unauthorized("invalid API key")),
        None => Err(unauthorized("missing x-api-key header")),
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

// ============ GET /lore/search ============

#[derive(Deserialize)]
struct SearchParams {
    q: String,
    category: Option<String>,
    limit: Option<usize>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let hits = state
        .sync
        .search(&params.q, params.category.as_deref(), params.limit)
        .await?;
    Ok(Json(serde_json::json!(hits)))
}

// ============ GET /lore ============

#[derive(Deserialize)]
struct ListParams {
    category: Option<String>,
    #[serde(default)]
    full: bool,
}

async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entries = state
        .sync
        .store()
        .list(params.category.as_deref())
        .await
        .map_err(LoreError::Store)?;

    if params.full {
        Ok(Json(serde_json::json!(entries)))
    } else {
        let summaries: Vec<_> = entries.iter().map(|e| e.summary()).collect();
        Ok(Json(serde_json::json!(summaries)))
    }
}

// ============ GET /lore/categories ============

async fn handle_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let categories = state
        .sync
        .store()
        .list_categories()
        .await
        .map_err(LoreError::Store)?;
    Ok(Json(categories))
}

// ============ GET /lore/{id} ============

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entry = state
        .sync
        .store()
        .get(&id)
        .await
        .map_err(LoreError::Store)?
        .ok_or_else(|| not_found(format!("entry not found: {id}")))?;
    Ok(Json(serde_json::json!(entry)))
}

// ============ POST /lore ============

async fn handle_create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewEntry>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_api_key(&state, &headers)?;
    let entry = state.sync.create_entry(input).await?;
    Ok(Json(serde_json::json!(entry)))
}

// ============ PATCH /lore/{id} ============

async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<EntryPatch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_api_key(&state, &headers)?;
    let entry = state
        .sync
        .update_entry(&id, patch)
        .await?
        .ok_or_else(|| not_found(format!("entry not found: {id}")))?;
    Ok(Json(serde_json::json!(entry)))
}

// ============ DELETE /lore/{id} ============

async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_api_key(&state, &headers)?;
    let deleted = state.sync.delete_entry(&id).await?;
    if !deleted {
        return Err(not_found(format!("entry not found: {id}")));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}
