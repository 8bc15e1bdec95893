use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use log::{info, warn};

use super::{json_body, ClientIdentity};
use crate::app::is_plausible_email;
use crate::config::REPORT_LIMIT;
use crate::reports::ResolvedReport;
use crate::server::error::ApiError;
use crate::server::rate_limit::admit;
use crate::server::types::{AppState, StatusBody, TrackRequest, UrlEmailRequest};
use crate::storage::{record_page_view, save_scan};

/// Name of the legacy demo page served at `/report-demo`.
const DEMO_REPORT: &str = "demo";

/// `POST /report`: scans the URL and emails a link to the full report.
pub async fn request_report(
    State(state): State<AppState>,
    client: ClientIdentity,
    payload: Result<Json<UrlEmailRequest>, JsonRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let request = json_body(payload)?;
    let email = request.email.trim();
    if !is_plausible_email(email) {
        return Err(ApiError::BadRequest(
            "A valid email address is required".to_string(),
        ));
    }
    admit(&state, &client.ip, &REPORT_LIMIT).await?;

    let report = state.scanner.scan(&request.url).await?;
    let scan_id = save_scan(&state.pool, &report, client.origin()).await?;
    let token = state.tokens.issue(scan_id, email).await?;

    state.notifier.notify_scan(&report, Some(&client.ip));
    if !state.notifier.notify_report(email, &token, &report) {
        warn!("Report email for {} could not be queued", report.hostname);
    }
    info!("Report for {} requested by {email}", report.hostname);

    Ok(Json(StatusBody {
        status: "queued",
        message: Some(format!(
            "The report for {} will be sent to {email}",
            report.hostname
        )),
    }))
}

/// `GET /report/{name}`: a static page, or the stored scan behind a token.
pub async fn report(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    resolve(&state, &name).await
}

/// `GET /report-demo`
pub async fn report_demo(State(state): State<AppState>) -> Result<Response, ApiError> {
    resolve(&state, DEMO_REPORT).await
}

async fn resolve(state: &AppState, name: &str) -> Result<Response, ApiError> {
    Ok(match state.reports.resolve(name).await? {
        ResolvedReport::Html(page) => Html(page).into_response(),
        ResolvedReport::Scan(scan) => Json(scan).into_response(),
    })
}

/// `POST /track`: records a page view. Storage failures are logged only.
pub async fn track(
    State(state): State<AppState>,
    client: ClientIdentity,
    payload: Result<Json<TrackRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let request = json_body(payload)?;
    let Some(path) = request.path.as_deref().filter(|p| !p.trim().is_empty()) else {
        return Err(ApiError::BadRequest("path is required".to_string()));
    };

    if let Err(e) =
        record_page_view(&state.pool, path, request.referrer.as_deref(), client.origin()).await
    {
        warn!("Failed to record page view of {path}: {e}");
    }
    Ok(StatusCode::NO_CONTENT)
}
