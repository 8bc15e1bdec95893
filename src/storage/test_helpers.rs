//! Shared test helpers for storage module tests.

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::models::{Finding, ScanReport};
use crate::storage::run_migrations;

/// Creates an in-memory database pool with migrations applied.
///
/// Pinned to one long-lived connection: every new in-memory connection is a
/// new, empty database.
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

/// A small scored report for `hostname`.
pub fn sample_report(hostname: &str) -> ScanReport {
    ScanReport::from_findings(
        format!("https://{hostname}"),
        hostname,
        vec![
            Finding::pass("hsts", "HSTS", "HTTP Headers", "present"),
            Finding::fail("csp", "Content-Security-Policy", "HTTP Headers", "missing"),
        ],
        Duration::from_millis(420),
    )
}
