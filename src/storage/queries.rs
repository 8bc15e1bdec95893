//! Database read operations for the admin surface and report resolution.
//!
//! Listings are newest first. Aggregates are computed per call rather than
//! maintained incrementally; admin traffic is low.

use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::config::{STATS_DAYS, STATS_TOP_DOMAINS};
use crate::error_handling::DatabaseError;

use super::models::{
    DailyCount, HostnameCount, Page, PageRequest, PersistedPayment, PersistedReport,
    PersistedScan, Stats,
};

const SCAN_COLUMNS: &str = "id, url, hostname, score, grade, checks, scan_time_seconds, \
     total_checks, passed, warnings, failed, ip_address, user_agent, created_at";

fn scan_from_row(row: &SqliteRow) -> Result<PersistedScan, DatabaseError> {
    let checks_raw: String = row.try_get("checks")?;
    let checks = serde_json::from_str(&checks_raw).map_err(|e| {
        DatabaseError::CorruptRecord(format!("scan checks are not valid JSON: {e}"))
    })?;

    Ok(PersistedScan {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        hostname: row.try_get("hostname")?,
        score: row.try_get("score")?,
        grade: row.try_get("grade")?,
        checks,
        scan_time_seconds: row.try_get("scan_time_seconds")?,
        total_checks: row.try_get("total_checks")?,
        passed: row.try_get("passed")?,
        warnings: row.try_get("warnings")?,
        failed: row.try_get("failed")?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        created_at: row.try_get("created_at")?,
    })
}

fn report_from_row(row: &SqliteRow) -> Result<PersistedReport, DatabaseError> {
    Ok(PersistedReport {
        id: row.try_get("id")?,
        scan_id: row.try_get("scan_id")?,
        email: row.try_get("email")?,
        token: row.try_get("token")?,
        created_at: row.try_get("created_at")?,
    })
}

fn payment_from_row(row: &SqliteRow) -> Result<PersistedPayment, DatabaseError> {
    Ok(PersistedPayment {
        id: row.try_get("id")?,
        payment_id: row.try_get("payment_id")?,
        status: row.try_get("status")?,
        email: row.try_get("email")?,
        url: row.try_get("url")?,
        external_reference: row.try_get("external_reference")?,
        amount: row.try_get("amount")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Escapes `LIKE` wildcards so `value` matches literally under `ESCAPE '\\'`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Appends the optional hostname substring filter.
fn push_hostname_filter(builder: &mut QueryBuilder<'_, Sqlite>, hostname: Option<&str>) {
    if let Some(hostname) = hostname.map(str::trim).filter(|h| !h.is_empty()) {
        builder
            .push(" WHERE hostname LIKE ")
            .push_bind(format!("%{}%", escape_like(hostname)))
            .push(" ESCAPE '\\'");
    }
}

/// Lists scans, optionally filtered by a hostname substring.
pub async fn get_scans(
    pool: &SqlitePool,
    page: PageRequest,
    hostname: Option<&str>,
) -> Result<Page<PersistedScan>, DatabaseError> {
    let mut count_query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM scans");
    push_hostname_filter(&mut count_query, hostname);
    let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let mut list_query = QueryBuilder::<Sqlite>::new(format!("SELECT {SCAN_COLUMNS} FROM scans"));
    push_hostname_filter(&mut list_query, hostname);
    list_query
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(i64::from(page.limit()))
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = list_query.build().fetch_all(pool).await?;

    Ok(Page {
        items: rows.iter().map(scan_from_row).collect::<Result<_, _>>()?,
        total,
        page: page.page(),
        limit: page.limit(),
    })
}

pub async fn get_scan(pool: &SqlitePool, id: i64) -> Result<Option<PersistedScan>, DatabaseError> {
    let row = sqlx::query(&format!("SELECT {SCAN_COLUMNS} FROM scans WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(scan_from_row).transpose()
}

pub async fn get_reports(
    pool: &SqlitePool,
    page: PageRequest,
) -> Result<Page<PersistedReport>, DatabaseError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports")
        .fetch_one(pool)
        .await?;
    let rows = sqlx::query(
        "SELECT id, scan_id, email, token, created_at FROM reports
         ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(i64::from(page.limit()))
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page {
        items: rows.iter().map(report_from_row).collect::<Result<_, _>>()?,
        total,
        page: page.page(),
        limit: page.limit(),
    })
}

/// Looks up a report by its access token, regardless of age.
pub async fn get_report_by_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<PersistedReport>, DatabaseError> {
    let row = sqlx::query(
        "SELECT id, scan_id, email, token, created_at FROM reports WHERE token = ?",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(report_from_row).transpose()
}

const PAYMENT_COLUMNS: &str =
    "id, payment_id, status, email, url, external_reference, amount, created_at, updated_at";

pub async fn get_payments(
    pool: &SqlitePool,
    page: PageRequest,
) -> Result<Page<PersistedPayment>, DatabaseError> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
        .fetch_one(pool)
        .await?;
    let rows = sqlx::query(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
    ))
    .bind(i64::from(page.limit()))
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page {
        items: rows.iter().map(payment_from_row).collect::<Result<_, _>>()?,
        total,
        page: page.page(),
        limit: page.limit(),
    })
}

pub async fn get_payment_by_external_reference(
    pool: &SqlitePool,
    external_reference: &str,
) -> Result<Option<PersistedPayment>, DatabaseError> {
    let row = sqlx::query(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE external_reference = ?"
    ))
    .bind(external_reference)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(payment_from_row).transpose()
}

async fn count(pool: &SqlitePool, query: &str) -> Result<i64, DatabaseError> {
    Ok(sqlx::query_scalar::<_, i64>(query).fetch_one(pool).await?)
}

async fn daily_counts(pool: &SqlitePool, table: &str) -> Result<Vec<DailyCount>, DatabaseError> {
    let rows = sqlx::query(&format!(
        "SELECT date(created_at) AS day, COUNT(*) AS count FROM {table}
         WHERE created_at >= datetime('now', ?)
         GROUP BY day ORDER BY day DESC LIMIT ?"
    ))
    .bind(format!("-{STATS_DAYS} days"))
    .bind(i64::from(STATS_DAYS))
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| -> Result<DailyCount, DatabaseError> {
            Ok(DailyCount {
                day: r.try_get("day")?,
                count: r.try_get("count")?,
            })
        })
        .collect()
}

/// Dashboard aggregates.
pub async fn get_stats(pool: &SqlitePool) -> Result<Stats, DatabaseError> {
    let total_scans = count(pool, "SELECT COUNT(*) FROM scans").await?;
    let total_reports = count(pool, "SELECT COUNT(*) FROM reports").await?;
    let total_payments = count(pool, "SELECT COUNT(*) FROM payments").await?;
    let approved_payments =
        count(pool, "SELECT COUNT(*) FROM payments WHERE status = 'approved'").await?;
    let total_page_views = count(pool, "SELECT COUNT(*) FROM page_views").await?;

    let top_domains = sqlx::query(
        "SELECT hostname, COUNT(*) AS count FROM scans
         GROUP BY hostname ORDER BY count DESC, hostname ASC LIMIT ?",
    )
    .bind(i64::from(STATS_TOP_DOMAINS))
    .fetch_all(pool)
    .await?
    .iter()
    .map(|r| -> Result<HostnameCount, DatabaseError> {
        Ok(HostnameCount {
            hostname: r.try_get("hostname")?,
            count: r.try_get("count")?,
        })
    })
    .collect::<Result<Vec<_>, DatabaseError>>()?;

    let conversion_rate = if total_payments > 0 {
        approved_payments as f64 / total_payments as f64
    } else {
        0.0
    };

    Ok(Stats {
        total_scans,
        total_reports,
        total_payments,
        approved_payments,
        conversion_rate,
        total_page_views,
        scans_per_day: daily_counts(pool, "scans").await?,
        top_domains,
        page_views_per_day: daily_counts(pool, "page_views").await?,
    })
}
