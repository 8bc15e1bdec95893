//! Database write operations.
//!
//! Every write is a single statement; there are no cross-table transactions.
//! A crash between a scan write and its report write leaves an orphan scan,
//! which is harmless since a report can always be regenerated.

use chrono::{DateTime, Utc};
use log::{debug, error};
use sqlx::{Row, SqlitePool};

use crate::error_handling::DatabaseError;
use crate::models::ScanReport;

use super::models::{NewPayment, RequestOrigin};

/// Timestamp format shared with SQLite's `datetime()`, so `date(created_at)` works.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Inserts a completed scan and returns its id.
pub async fn save_scan(
    pool: &SqlitePool,
    report: &ScanReport,
    origin: RequestOrigin<'_>,
) -> Result<i64, DatabaseError> {
    let checks = serde_json::to_string(&report.checks)
        .map_err(|e| DatabaseError::CorruptRecord(format!("checks not serializable: {e}")))?;

    let row = sqlx::query(
        "INSERT INTO scans (
            url, hostname, score, grade, checks, scan_time_seconds,
            total_checks, passed, warnings, failed, ip_address, user_agent, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id",
    )
    .bind(&report.url)
    .bind(&report.hostname)
    .bind(i64::from(report.score))
    .bind(report.grade.as_str())
    .bind(checks)
    .bind(report.scan_time_seconds)
    .bind(report.total_checks as i64)
    .bind(report.passed as i64)
    .bind(report.warnings as i64)
    .bind(report.failed as i64)
    .bind(origin.ip_address)
    .bind(origin.user_agent)
    .bind(format_timestamp(Utc::now()))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        error!("Failed to save scan for {}: {e}", report.hostname);
        DatabaseError::SqlError(e)
    })?;

    let id: i64 = row.try_get("id")?;
    debug!("Saved scan {id} for {}", report.hostname);
    Ok(id)
}

/// Inserts an emailed report with its access token.
pub async fn save_report(
    pool: &SqlitePool,
    scan_id: Option<i64>,
    email: &str,
    token: &str,
    issued_at: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    let row = sqlx::query(
        "INSERT INTO reports (scan_id, email, token, created_at)
         VALUES (?, ?, ?, ?)
         RETURNING id",
    )
    .bind(scan_id)
    .bind(email)
    .bind(token)
    .bind(format_timestamp(issued_at))
    .fetch_one(pool)
    .await
    .map_err(|e| {
        error!("Failed to save report for scan {scan_id:?}: {e}");
        DatabaseError::SqlError(e)
    })?;

    Ok(row.try_get("id")?)
}

/// Inserts a payment unless one with the same external reference exists.
///
/// Returns `true` when a row was inserted. Redelivered notifications and
/// repeated checkouts land here and leave the existing row untouched.
pub async fn insert_payment_if_absent(
    pool: &SqlitePool,
    payment: &NewPayment<'_>,
) -> Result<bool, DatabaseError> {
    let now = format_timestamp(Utc::now());
    let result = sqlx::query(
        "INSERT INTO payments (
            payment_id, status, email, url, external_reference, amount, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(external_reference) DO NOTHING",
    )
    .bind(payment.payment_id)
    .bind(payment.status)
    .bind(payment.email)
    .bind(payment.url)
    .bind(payment.external_reference)
    .bind(payment.amount)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(
            "Failed to insert payment {}: {e}",
            payment.external_reference
        );
        DatabaseError::SqlError(e)
    })?;

    Ok(result.rows_affected() == 1)
}

/// Moves a payment to `status` unless it is already there or already approved.
///
/// The update is conditional, so among concurrent deliveries of the same
/// notification exactly one observes `true`. `approved` is terminal. A known
/// provider payment id is recorded alongside; an absent one keeps the stored value.
pub async fn transition_payment_status(
    pool: &SqlitePool,
    external_reference: &str,
    payment_id: Option<&str>,
    status: &str,
) -> Result<bool, DatabaseError> {
    let result = sqlx::query(
        "UPDATE payments
         SET status = ?, payment_id = COALESCE(?, payment_id), updated_at = ?
         WHERE external_reference = ? AND status != ? AND status != 'approved'",
    )
    .bind(status)
    .bind(payment_id)
    .bind(format_timestamp(Utc::now()))
    .bind(external_reference)
    .bind(status)
    .execute(pool)
    .await
    .map_err(|e| {
        error!("Failed to update payment {external_reference} to {status}: {e}");
        DatabaseError::SqlError(e)
    })?;

    Ok(result.rows_affected() == 1)
}

pub async fn record_page_view(
    pool: &SqlitePool,
    path: &str,
    referrer: Option<&str>,
    origin: RequestOrigin<'_>,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO page_views (path, referrer, user_agent, ip_address, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(path)
    .bind(referrer)
    .bind(origin.user_agent)
    .bind(origin.ip_address)
    .bind(format_timestamp(Utc::now()))
    .execute(pool)
    .await
    .map_err(DatabaseError::SqlError)?;

    Ok(())
}
