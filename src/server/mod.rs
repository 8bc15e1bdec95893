//! HTTP API.
//!
//! Public endpoints:
//! - `POST /scan`, `POST /report`, `POST /checkout` (rate limited per client)
//! - `GET /report/{name}`, `GET /report-demo`
//! - `POST /webhooks/payment`, `POST /track`
//! - `GET /`, `GET /health`, `GET /status`
//!
//! Admin endpoints under `/admin` require the `X-Admin-Secret` header.

mod client;
mod error;
mod handlers;
mod rate_limit;
mod types;

use std::future::Future;
use std::net::SocketAddr;

use axum::http::{header, HeaderName, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use client::{client_ip, require_admin};
use crate::config::{HEADER_RATE_LIMIT_LIMIT, HEADER_RATE_LIMIT_REMAINING, HEADER_RATE_LIMIT_RESET};
pub use error::ApiError;
pub use handlers::ClientIdentity;
pub use rate_limit::rate_limit_headers;
pub use types::{AppState, StatusBody};

/// Builds the API router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/scan", post(handlers::scan))
        .route("/report", post(handlers::request_report))
        .route("/report/{name}", get(handlers::report))
        .route("/report-demo", get(handlers::report_demo))
        .route("/checkout", post(handlers::checkout))
        .route("/webhooks/payment", post(handlers::payment_webhook))
        .route("/track", post(handlers::track))
        .route("/admin/scans", get(handlers::admin_scans))
        .route("/admin/scans/{id}", get(handlers::admin_scan))
        .route("/admin/reports", get(handlers::admin_reports))
        .route("/admin/payments", get(handlers::admin_payments))
        .route("/admin/stats", get(handlers::admin_stats))
        .layer(cors_layer())
        .with_state(state)
}

/// Permissive CORS: any origin, the methods we route, any request headers.
/// Rate-limit headers are exposed so browser clients can read them.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(HEADER_RATE_LIMIT_LIMIT),
            HeaderName::from_static(HEADER_RATE_LIMIT_REMAINING),
            HeaderName::from_static(HEADER_RATE_LIMIT_RESET),
            header::RETRY_AFTER,
        ])
}

/// Binds the API listener.
pub async fn bind(addr: &str) -> Result<TcpListener, anyhow::Error> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind API server to {}: {}", addr, e))
}

/// Serves the API on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish once shutdown starts.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), anyhow::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        log::info!("API listening on http://{addr}/");
    }

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| anyhow::anyhow!("API server error: {}", e))?;

    Ok(())
}
