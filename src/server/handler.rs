//! Request Handlers
//!
//! Translate JSON requests into cache lookups. No locking happens here;
//! the cache's own guard is the only synchronization.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

use crate::metrics::Metrics;
use crate::storage::{Cache, Lookup};

/// Shared state for every request
#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: Cache,
    pub metrics: Arc<Metrics>,
}

/// Body of `POST /cache/get`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyRequest {
    pub key: String,
}

/// Client-side errors surfaced by the facade
#[derive(Debug, Error)]
pub enum FacadeError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

impl From<JsonRejection> for FacadeError {
    fn from(rejection: JsonRejection) -> Self {
        FacadeError::MalformedRequest(rejection.body_text())
    }
}

impl IntoResponse for FacadeError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            FacadeError::MalformedRequest(_) => (StatusCode::BAD_REQUEST, "malformed_request"),
        };
        let body = json!({
            "error": {
                "kind": kind,
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

pub async fn cache_get(
    State(state): State<AppState>,
    payload: Result<Json<KeyRequest>, JsonRejection>,
) -> Result<Json<Lookup>, FacadeError> {
    let Json(request) = payload?;

    let start = Instant::now();
    let lookup = state.cache.lookup(&request.key);
    let elapsed = start.elapsed();

    state.metrics.record_lookup(lookup.exists, elapsed);
    debug!(key = %request.key, exists = lookup.exists, latency = ?elapsed, "Cache lookup");

    Ok(Json(lookup))
}

pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
