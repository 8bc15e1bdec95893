//! Fetched artifact types.

use std::collections::HashMap;
use std::time::Duration;

/// Everything retrieved from the target by the single fetch.
///
/// Header names are lower-case and a repeated header keeps its last value.
/// `cookies` holds every `Set-Cookie` line as received, in order.
#[derive(Debug, Clone, Default)]
pub struct FetchResult {
    /// URL as submitted by the client
    pub url: String,
    /// URL of the final response after redirects
    pub final_url: String,
    /// HTTP status of the final response
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub cookies: Vec<String>,
    /// Response body, capped at `MAX_BODY_BYTES`
    pub body: String,
    /// Whether the body was cut at the cap
    pub body_truncated: bool,
    pub elapsed: Duration,
}
