//! Read-only admin listings behind `X-Admin-Secret`.
//!
//! The secret is checked before any path or query parsing, so an
//! unauthenticated caller gets 403 whatever the rest of the request holds.

use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::server::client::require_admin;
use crate::server::error::ApiError;
use crate::server::types::{AdminListQuery, AppState};
use crate::storage::{
    get_payments, get_reports, get_scan, get_scans, get_stats, Page, PageRequest,
    PersistedPayment, PersistedReport, PersistedScan, Stats,
};

type ListQuery = Result<Query<AdminListQuery>, QueryRejection>;

fn list_query(query: ListQuery) -> Result<AdminListQuery, ApiError> {
    query
        .map(|Query(query)| query)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn page_request(query: &AdminListQuery) -> PageRequest {
    PageRequest::new(query.page, query.limit)
}

pub async fn admin_scans(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: ListQuery,
) -> Result<Json<Page<PersistedScan>>, ApiError> {
    require_admin(&state, &headers)?;
    let query = list_query(query)?;
    let hostname = query.hostname.as_deref().filter(|h| !h.is_empty());
    Ok(Json(get_scans(&state.pool, page_request(&query), hostname).await?))
}

pub async fn admin_scan(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<PersistedScan>, ApiError> {
    require_admin(&state, &headers)?;
    let Path(id) = id.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    get_scan(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Scan {id} not found")))
}

pub async fn admin_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: ListQuery,
) -> Result<Json<Page<PersistedReport>>, ApiError> {
    require_admin(&state, &headers)?;
    let query = list_query(query)?;
    Ok(Json(get_reports(&state.pool, page_request(&query)).await?))
}

pub async fn admin_payments(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: ListQuery,
) -> Result<Json<Page<PersistedPayment>>, ApiError> {
    require_admin(&state, &headers)?;
    let query = list_query(query)?;
    Ok(Json(get_payments(&state.pool, page_request(&query)).await?))
}

pub async fn admin_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Stats>, ApiError> {
    require_admin(&state, &headers)?;
    Ok(Json(get_stats(&state.pool).await?))
}
