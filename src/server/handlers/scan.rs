use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;

use super::{json_body, ClientIdentity};
use crate::config::SCAN_LIMIT;
use crate::server::error::ApiError;
use crate::server::rate_limit::{admit, rate_limit_headers};
use crate::server::types::{AppState, ScanRequest};
use crate::storage::save_scan;

/// `POST /scan`: runs a scan and returns the report.
///
/// Persistence and the operator alert happen after the report is built; a
/// failure in either is logged and the client still gets its report.
pub async fn scan(
    State(state): State<AppState>,
    client: ClientIdentity,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = json_body(payload)?;
    let decision = admit(&state, &client.ip, &SCAN_LIMIT).await?;

    let report = state.scanner.scan(&request.url).await?;

    if let Err(e) = save_scan(&state.pool, &report, client.origin()).await {
        error!("Failed to store scan of {}: {e}", report.hostname);
    }
    state.notifier.notify_scan(&report, Some(&client.ip));

    Ok((rate_limit_headers(&decision), Json(report)).into_response())
}
