use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{SERVICE_NAME, SERVICE_VERSION};
use crate::server::types::AppState;

/// `GET /`: service banner.
pub async fn root() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
    }))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub uptime_seconds: f64,
    pub completed_scans: usize,
    pub scans_per_minute: f64,
    pub errors: ErrorCounts,
    /// (client, endpoint) pairs currently tracked by the rate limiter
    pub rate_limited_keys: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorCounts {
    pub total: usize,
    pub by_kind: HashMap<&'static str, usize>,
}

/// `GET /status`: in-process counters since startup.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let stats = state.scanner.stats();
    let elapsed = state.started_at.elapsed().as_secs_f64();
    let completed = stats.completed_scans();
    let rate = if elapsed > 0.0 {
        completed as f64 / elapsed * 60.0
    } else {
        0.0
    };

    Json(StatusResponse {
        uptime_seconds: elapsed,
        completed_scans: completed,
        scans_per_minute: rate,
        errors: ErrorCounts {
            total: stats.total_errors(),
            by_kind: stats.snapshot(),
        },
        rate_limited_keys: state.limiter.tracked_keys().await,
    })
}
