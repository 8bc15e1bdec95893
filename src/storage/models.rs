//! Row types returned by the storage reads.

use serde::Serialize;

use crate::config::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// A stored scan. `checks` holds the findings exactly as they were reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedScan {
    pub id: i64,
    pub url: String,
    pub hostname: String,
    pub score: i64,
    pub grade: String,
    pub checks: serde_json::Value,
    pub scan_time_seconds: f64,
    pub total_checks: i64,
    pub passed: i64,
    pub warnings: i64,
    pub failed: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistedReport {
    pub id: i64,
    pub scan_id: Option<i64>,
    pub email: String,
    pub token: String,
    pub created_at: String,
}

/// A checkout attempt and its latest known provider status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedPayment {
    pub id: i64,
    pub payment_id: Option<String>,
    pub status: String,
    pub email: String,
    pub url: String,
    pub external_reference: String,
    pub amount: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Values for a new payment row.
#[derive(Debug, Clone)]
pub struct NewPayment<'a> {
    pub payment_id: Option<&'a str>,
    pub status: &'a str,
    pub email: &'a str,
    pub url: &'a str,
    pub external_reference: &'a str,
    pub amount: Option<f64>,
}

/// Where a scan request came from.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOrigin<'a> {
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

/// Page selection for listings. Out-of-range values are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// `page` is 1-based; `limit` is clamped to `[1, MAX_PAGE_LIMIT]`.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub(crate) fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of a listing plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub day: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostnameCount {
    pub hostname: String,
    pub count: i64,
}

/// Aggregates for the admin dashboard, computed at query time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_scans: i64,
    pub total_reports: i64,
    pub total_payments: i64,
    pub approved_payments: i64,
    /// Approved payments over all checkout attempts, 0.0 when there are none
    pub conversion_rate: f64,
    pub total_page_views: i64,
    pub scans_per_day: Vec<DailyCount>,
    pub top_domains: Vec<HostnameCount>,
    pub page_views_per_day: Vec<DailyCount>,
}
