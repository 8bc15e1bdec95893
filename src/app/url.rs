//! Scan target validation and normalization.

use log::warn;

use crate::config::MAX_URL_LENGTH;
use crate::error_handling::ScanError;

/// A submitted URL that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    /// Normalized URL (scheme added when missing)
    pub url: String,
    /// Lower-cased host, without brackets for IPv6
    pub hostname: String,
}

/// Validates and normalizes a submitted URL.
///
/// Surrounding whitespace is trimmed and `https://` is prefixed when the input
/// carries no `http://`/`https://` scheme. The result must parse, use an
/// http(s) scheme and name a host. Rejected before any network activity.
///
/// # Errors
///
/// Returns `ScanError::InvalidInput` when the URL is empty, longer than
/// `MAX_URL_LENGTH`, unparseable, or has no host.
pub fn validate_scan_url(raw: &str) -> Result<ScanTarget, ScanError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ScanError::InvalidInput("URL is required".to_string()));
    }

    let lower = trimmed.to_ascii_lowercase();
    let normalized = if !lower.starts_with("http://") && !lower.starts_with("https://") {
        format!("https://{trimmed}")
    } else {
        trimmed.to_string()
    };

    // Checked after normalization since the prefix can push it over
    if normalized.len() > MAX_URL_LENGTH {
        warn!(
            "Rejecting URL exceeding maximum length ({} > {MAX_URL_LENGTH})",
            normalized.len()
        );
        return Err(ScanError::InvalidInput(format!(
            "URL exceeds {MAX_URL_LENGTH} characters"
        )));
    }

    let parsed = url::Url::parse(&normalized)
        .map_err(|e| ScanError::InvalidInput(format!("{trimmed}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScanError::InvalidInput(format!(
            "unsupported scheme {}",
            parsed.scheme()
        )));
    }
    let hostname = match parsed.host_str() {
        Some(host) if !host.is_empty() => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_ascii_lowercase(),
        _ => return Err(ScanError::InvalidInput(format!("{trimmed}: missing host"))),
    };

    Ok(ScanTarget {
        url: normalized,
        hostname,
    })
}

/// Basic shape check for a notification address.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}
