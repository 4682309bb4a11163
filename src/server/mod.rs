//! REST API exposing event statistics

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::stats::{Analyzer, StatEntry};
use crate::storage::MonitorStore;

/// Fallback window parameters applied when a request omits them.
#[derive(Debug, Clone, Copy)]
pub struct StatsDefaults {
    pub days: i64,
    pub limit: usize,
}

/// API server for the statistics endpoints.
pub struct StatsServer {
    store: Arc<dyn MonitorStore>,
    defaults: StatsDefaults,
    port: u16,
}

impl StatsServer {
    pub fn new(store: Arc<dyn MonitorStore>, defaults: StatsDefaults, port: u16) -> Self {
        Self {
            store,
            defaults,
            port,
        }
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let app = router(self.store, self.defaults);

        info!("Starting stats API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the API router. Exposed separately so tests can serve it on an
/// ephemeral port.
pub fn router(store: Arc<dyn MonitorStore>, defaults: StatsDefaults) -> Router {
    let state = Arc::new(ApiState { store, defaults });

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/stats", get(all_stats))
        .route("/api/stats/{slug}", get(repo_stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

struct ApiState {
    store: Arc<dyn MonitorStore>,
    defaults: StatsDefaults,
}

/// Raw query parameters; kept as strings so validation produces a 400
/// instead of a rejection with an opaque body.
#[derive(Debug, Deserialize)]
struct StatsQuery {
    days: Option<String>,
    limit: Option<String>,
}

impl StatsQuery {
    /// Boundary validation: absent values fall back to the configured
    /// defaults; present but non-integer or non-positive values are a 400.
    /// The core never sees invalid values.
    fn resolve(&self, defaults: StatsDefaults) -> Result<(i64, usize), ApiError> {
        let days = match &self.days {
            None => defaults.days,
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|days| *days > 0)
                .ok_or_else(|| {
                    ApiError::bad_request("Parameter 'days' must be a positive integer.")
                })?,
        };
        let limit = match &self.limit {
            None => defaults.limit,
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|limit| *limit > 0)
                .ok_or_else(|| {
                    ApiError::bad_request("Parameter 'limit' must be a positive integer.")
                })?,
        };
        Ok((days, limit))
    }
}

struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!("stats request failed: {message}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn all_stats(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<Vec<StatEntry>>, ApiError> {
    let (days, limit) = params.resolve(state.defaults)?;
    let entries = Analyzer::new(days, limit)
        .stats(state.store.as_ref(), None)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(entries))
}

async fn repo_stats(
    State(state): State<Arc<ApiState>>,
    Path(slug): Path<String>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<Vec<StatEntry>>, ApiError> {
    let (days, limit) = params.resolve(state.defaults)?;

    let repo = state
        .store
        .get_repository(&slug)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found(format!("Repository '{slug}' not found")))?;

    let entries = Analyzer::new(days, limit)
        .stats(state.store.as_ref(), Some(&repo))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Json(entries))
}
