//! HTTP routes
//!
//! | Route                    | Purpose                                   |
//! |--------------------------|-------------------------------------------|
//! | `GET /config/export`     | Resolved, redacted configuration          |
//! | `GET /config/sources`    | Registered sources, no values             |
//! | `POST /config/refresh`   | Reload file sources                       |
//! | `POST /encrypt`          | Body → `{cipher}` text                    |
//! | `POST /decrypt`          | `{cipher}` text → body (opt-in)           |
//! | `GET /encrypt/status`    | Whether a cipher key is configured        |
//! | `GET /health`            | Liveness                                  |

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use confseal_core::{ConfigService, ExportFormat, PropertySource, SourceLoader};

use crate::error::ApiError;

/// Response header carrying the number of unresolved keys in an export
pub const UNRESOLVED_HEADER: HeaderName = HeaderName::from_static("x-confseal-unresolved");

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConfigService>,
    pub loader: Arc<dyn SourceLoader>,
    pub decrypt_enabled: bool,
}

impl AppState {
    pub fn new(service: Arc<ConfigService>, loader: Arc<dyn SourceLoader>) -> Self {
        Self {
            service,
            loader,
            decrypt_enabled: false,
        }
    }

    pub fn with_decrypt(mut self, enabled: bool) -> Self {
        self.decrypt_enabled = enabled;
        self
    }
}

/// Build the router; `request_timeout` bounds each request end to end
pub fn create_router(state: AppState, request_timeout: Option<Duration>) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/config/export", get(export_config))
        .route("/config/sources", get(list_sources))
        .route("/config/refresh", post(refresh_sources))
        .route("/encrypt", post(encrypt))
        .route("/encrypt/status", get(encrypt_status))
        .route("/decrypt", post(decrypt))
        .with_state(state);

    let router = match request_timeout {
        Some(timeout) => router.layer(TimeoutLayer::new(timeout)),
        None => router,
    };
    router.layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// One registered source as listed by `/config/sources`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub priority: i32,
    pub origin: Option<String>,
    pub keys: usize,
}

impl From<&PropertySource> for SourceInfo {
    fn from(source: &PropertySource) -> Self {
        Self {
            name: source.name().to_string(),
            priority: source.priority(),
            origin: source.origin().map(str::to_string),
            keys: source.len(),
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "UP" }))
}

async fn export_config(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = match query.format.as_deref() {
        Some(name) => name.parse::<ExportFormat>()?,
        None => ExportFormat::default(),
    };

    let output = state.service.export(format).await?;
    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static(format.content_type())),
            (UNRESOLVED_HEADER, HeaderValue::from(output.unresolved)),
        ],
        output.bytes,
    )
        .into_response())
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceInfo>> {
    let snapshot = state.service.registry().all();
    Json(snapshot.iter().map(|s| SourceInfo::from(s.as_ref())).collect())
}

async fn refresh_sources(State(state): State<AppState>) -> Result<Json<Vec<SourceInfo>>, ApiError> {
    let snapshot = state.service.refresh(state.loader.as_ref()).await?;
    Ok(Json(snapshot.iter().map(|s| SourceInfo::from(s.as_ref())).collect()))
}

async fn encrypt(State(state): State<AppState>, body: String) -> Result<String, ApiError> {
    Ok(state.service.encrypt(&body)?)
}

async fn decrypt(State(state): State<AppState>, body: String) -> Result<String, ApiError> {
    if !state.decrypt_enabled {
        return Err(ApiError::NotFound);
    }
    Ok(state.service.decrypt(body.trim())?)
}

async fn encrypt_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = if state.service.cipher().is_available() {
        "OK"
    } else {
        "NO_KEY"
    };
    Json(serde_json::json!({ "status": status }))
}
