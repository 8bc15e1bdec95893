//! Configuration constants.
//!
//! This module defines the constants used throughout the service: fetch and
//! check timeouts, size limits, rate-limit budgets and pagination caps.

use std::time::Duration;

/// Default SQLite database path
pub const DB_PATH: &str = "./webseccheck.db";

/// Default port for the HTTP API
pub const DEFAULT_PORT: u16 = 8000;

// Fetch timeouts
/// TCP connection timeout in seconds
pub const TCP_CONNECT_TIMEOUT_SECS: u64 = 5;
/// Response timeout applied by the HTTP client (covers redirects and body)
pub const FETCH_TIMEOUT_SECS: u64 = 10;
/// Governing wall-clock bound for the whole fetch, enforced around every fetcher
pub const FETCH_DEADLINE_SECS: u64 = 15;
/// Aggregate deadline covering all analyzers of one scan together
pub const CHECK_DEADLINE_SECS: u64 = 25;

// Analyzer-internal timeouts (analyzers bound their own latency)
/// DNS query timeout in seconds
pub const DNS_TIMEOUT_SECS: u64 = 3;
/// TLS handshake timeout in seconds
pub const TLS_HANDSHAKE_TIMEOUT_SECS: u64 = 5;

/// Maximum number of body bytes retained from the target response.
/// Analyzer cost is proportional to body size, so everything past this is dropped.
pub const MAX_BODY_BYTES: usize = 200_000;

/// Maximum number of redirect hops followed by the fetcher
pub const MAX_REDIRECT_HOPS: usize = 10;

/// Maximum URL length accepted from clients
pub const MAX_URL_LENGTH: usize = 2048;

/// Maximum number of scans allowed to run at the same time
pub const DEFAULT_MAX_CONCURRENT_SCANS: usize = 32;

// Sliding-window rate limiting
/// Short admission window
pub const MINUTE_WINDOW: Duration = Duration::from_secs(60);
/// Long admission window; also the longest window the limiter keeps timestamps for
pub const HOUR_WINDOW: Duration = Duration::from_secs(3600);
/// Interval of the background sweep that prunes expired timestamps
pub const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Per-endpoint admission budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointLimit {
    pub endpoint: &'static str,
    pub max_per_minute: u32,
    pub max_per_hour: u32,
}

pub const SCAN_LIMIT: EndpointLimit = EndpointLimit {
    endpoint: "scan",
    max_per_minute: 5,
    max_per_hour: 30,
};

pub const REPORT_LIMIT: EndpointLimit = EndpointLimit {
    endpoint: "report",
    max_per_minute: 3,
    max_per_hour: 10,
};

pub const CHECKOUT_LIMIT: EndpointLimit = EndpointLimit {
    endpoint: "checkout",
    max_per_minute: 5,
    max_per_hour: 20,
};

// Persistence reads
/// Default page size for admin listings
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
/// Hard cap on page size for admin listings
pub const MAX_PAGE_LIMIT: u32 = 100;
/// Number of days shown in the scans-per-day aggregate
pub const STATS_DAYS: u32 = 30;
/// Number of hostnames shown in the top-domains aggregate
pub const STATS_TOP_DOMAINS: u32 = 20;

/// Report tokens stop resolving after this many days
pub const REPORT_TOKEN_TTL_DAYS: i64 = 30;

// Notifications
/// Capacity of the background email queue
pub const DEFAULT_NOTIFICATION_QUEUE_CAPACITY: usize = 256;
/// Maximum emails in flight at once
pub const MAX_CONCURRENT_EMAILS: usize = 4;
/// Timeout for a single email API call
pub const EMAIL_TIMEOUT_SECS: u64 = 10;
/// Resend API endpoint
pub const RESEND_API_URL: &str = "https://api.resend.com/emails";
/// Default sender address
pub const DEFAULT_EMAIL_FROM: &str = "WebSecCheck <reports@webseccheck.com>";

// Payments
/// MercadoPago API base
pub const MERCADOPAGO_API_BASE: &str = "https://api.mercadopago.com";
/// Timeout for payment-provider API calls
pub const PAYMENT_TIMEOUT_SECS: u64 = 10;
/// Default price of a full report
pub const DEFAULT_REPORT_PRICE: f64 = 9.0;
/// Separator of the `email|||url|||nonce` external reference wire format
pub const EXTERNAL_REFERENCE_SEPARATOR: &str = "|||";

/// Default public base URL used in report links
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default User-Agent string for the target fetch.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; WebSecCheck/1.0; +https://webseccheck.com/about)";

/// Service identification returned by `GET /`
pub const SERVICE_NAME: &str = "WebSecCheck API";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
