//! Opaque access tokens for emailed reports.
//!
//! A token is a random hex string stored in the `reports` table next to the
//! scan it unlocks. Tokens stop resolving `REPORT_TOKEN_TTL_DAYS` after issue.

use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use log::{debug, warn};
use rand::RngCore;

use crate::config::REPORT_TOKEN_TTL_DAYS;
use crate::error_handling::DatabaseError;
use crate::storage::insert::TIMESTAMP_FORMAT;
use crate::storage::{get_report_by_token, get_scan, save_report, DbPool, PersistedScan};

const TOKEN_BYTES: usize = 24;

/// Issues and validates report tokens.
#[derive(Clone)]
pub struct ReportTokens {
    pool: DbPool,
    ttl: ChronoDuration,
}

impl ReportTokens {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            ttl: ChronoDuration::days(REPORT_TOKEN_TTL_DAYS),
        }
    }

    pub fn with_ttl(mut self, ttl: ChronoDuration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Creates a token for `email` that unlocks the stored scan `scan_id`.
    pub async fn issue(&self, scan_id: i64, email: &str) -> Result<String, DatabaseError> {
        let token = generate_token();
        save_report(&self.pool, Some(scan_id), email, &token, Utc::now()).await?;
        debug!("Issued report token for scan {scan_id}");
        Ok(token)
    }

    /// Resolves a token to its scan.
    ///
    /// Returns `None` for unknown, malformed or expired tokens and for storage
    /// failures; it never errors.
    pub async fn validate(&self, token: &str) -> Option<PersistedScan> {
        if token.is_empty() || token.len() > TOKEN_BYTES * 4 {
            return None;
        }

        let report = match get_report_by_token(&self.pool, token).await {
            Ok(Some(report)) => report,
            Ok(None) => return None,
            Err(e) => {
                warn!("Report token lookup failed: {e}");
                return None;
            }
        };

        let issued_at = match NaiveDateTime::parse_from_str(&report.created_at, TIMESTAMP_FORMAT) {
            Ok(at) => at.and_utc(),
            Err(e) => {
                warn!("Report {} has an unreadable timestamp: {e}", report.id);
                return None;
            }
        };
        if Utc::now() - issued_at > self.ttl {
            debug!("Report token for report {} has expired", report.id);
            return None;
        }

        match get_scan(&self.pool, report.scan_id?).await {
            Ok(scan) => scan,
            Err(e) => {
                warn!("Failed to load scan for report {}: {e}", report.id);
                None
            }
        }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
