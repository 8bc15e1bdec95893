//! Fetch error categorization.
//!
//! Maps `reqwest::Error` values onto the two client-facing fetch failures.
//! Timeouts are reported as `FetchTimeout` (HTTP 504); everything else that
//! prevents a response (refused connection, DNS, TLS, protocol) is a
//! `FetchError` (HTTP 502).

use super::types::ScanError;

/// Categorizes a `reqwest::Error` raised while fetching `url`.
///
/// # Arguments
///
/// * `url` - The URL that was being fetched
/// * `error` - The `reqwest::Error` to categorize
pub fn categorize_fetch_error(url: &str, error: reqwest::Error) -> ScanError {
    if error.is_timeout() {
        ScanError::FetchTimeout {
            url: url.to_string(),
            cause: error.to_string(),
        }
    } else {
        if error.is_connect() {
            log::debug!("Connection to {url} failed: {error}");
        } else if error.is_redirect() {
            log::debug!("Redirect limit reached for {url}: {error}");
        }
        ScanError::FetchError {
            url: url.to_string(),
            source: error,
        }
    }
}
