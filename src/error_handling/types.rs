//! Error type definitions.
//!
//! This module defines the error taxonomy used throughout the service. Scan
//! errors are client-facing and map onto distinct HTTP statuses; analyzer
//! errors never escape the orchestrator; integration errors are logged and
//! swallowed everywhere except the checkout endpoint.

use std::time::Duration;

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing an HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),

    /// Error initializing the DNS resolver.
    #[error("DNS resolver initialization error: {0}")]
    DnsResolverError(String),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// A stored value could not be decoded back into its domain type.
    #[error("Corrupt stored record: {0}")]
    CorruptRecord(String),
}

/// Errors that end a scan request.
///
/// Every variant is terminal for the request: the pipeline never retries and
/// never produces a partial report.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The submitted URL was rejected before any network activity.
    #[error("Invalid URL: {0}")]
    InvalidInput(String),

    /// The target did not answer within the client timeout or the wall-clock bound.
    #[error("Target site did not respond in time: {url} ({cause})")]
    FetchTimeout { url: String, cause: String },

    /// The target could not be reached (connection refused, DNS, TLS, protocol).
    #[error("Could not reach target site: {url}: {source}")]
    FetchError {
        url: String,
        #[source]
        source: ReqwestError,
    },

    /// The security checks did not complete within the aggregate deadline.
    #[error("Security checks timed out after {}s", .0.as_secs())]
    ScanTimeout(Duration),
}

impl ScanError {
    /// Returns the error category for logging and counters.
    pub fn kind(&self) -> ErrorType {
        match self {
            ScanError::InvalidInput(_) => ErrorType::InvalidInput,
            ScanError::FetchTimeout { .. } => ErrorType::FetchTimeout,
            ScanError::FetchError { .. } => ErrorType::FetchError,
            ScanError::ScanTimeout(_) => ErrorType::ScanTimeout,
        }
    }
}

/// Failure of a single analyzer invocation.
///
/// Never fatal: the orchestrator folds it into the report as one failing finding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    /// A network operation the analyzer depends on failed.
    #[error("{0}")]
    Network(String),

    /// The analyzer's own timeout fired.
    #[error("{0} timed out")]
    Timeout(String),

    /// The fetched artifacts could not be interpreted.
    #[error("{0}")]
    InvalidInput(String),

    /// The analyzer read an artifact it did not declare.
    #[error("artifact {0} was not provided to this analyzer")]
    Undeclared(&'static str),

    /// The analyzer panicked.
    #[error("analyzer panicked: {0}")]
    Panicked(String),
}

/// A status string outside `pass`, `warn`, `fail`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid check status {0:?}: expected pass, warn or fail")]
pub struct InvalidStatus(pub String);

/// Errors from outbound integrations (email, payment provider, webhooks).
///
/// These never interrupt the scan path; they are logged where they occur.
#[derive(Error, Debug)]
pub enum IntegrationError {
    /// The integration is not configured (missing credentials).
    #[error("{0} is not configured")]
    Unconfigured(&'static str),

    /// The remote service could not be reached or answered with an error.
    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// A payload from the remote service could not be interpreted.
    #[error("Malformed {service} payload: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },

    /// Persisting integration state failed.
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

impl IntegrationError {
    pub(crate) fn upstream(service: &'static str, err: impl std::fmt::Display) -> Self {
        IntegrationError::Upstream {
            service,
            message: err.to_string(),
        }
    }
}

/// Categories of request outcomes, used for log lines and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    InvalidInput,
    FetchTimeout,
    FetchError,
    ScanTimeout,
    AnalyzerFailure,
    AdmissionDenied,
    UpstreamIntegrationFailure,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::InvalidInput => "Invalid input",
            ErrorType::FetchTimeout => "Fetch timeout",
            ErrorType::FetchError => "Fetch error",
            ErrorType::ScanTimeout => "Scan timeout",
            ErrorType::AnalyzerFailure => "Analyzer failure",
            ErrorType::AdmissionDenied => "Admission denied",
            ErrorType::UpstreamIntegrationFailure => "Upstream integration failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_error_type_as_str_unique() {
        let names: std::collections::HashSet<_> = ErrorType::iter().map(|e| e.as_str()).collect();
        assert_eq!(names.len(), ErrorType::iter().count());
    }

    #[test]
    fn test_scan_error_kind() {
        assert_eq!(
            ScanError::InvalidInput("x".into()).kind(),
            ErrorType::InvalidInput
        );
        assert_eq!(
            ScanError::ScanTimeout(Duration::from_secs(25)).kind(),
            ErrorType::ScanTimeout
        );
        assert_eq!(
            ScanError::FetchTimeout {
                url: "https://example.com".into(),
                cause: "deadline".into()
            }
            .kind(),
            ErrorType::FetchTimeout
        );
    }

    #[test]
    fn test_scan_timeout_message() {
        let msg = ScanError::ScanTimeout(Duration::from_secs(25)).to_string();
        assert_eq!(msg, "Security checks timed out after 25s");
    }

    #[test]
    fn test_analyzer_error_display() {
        assert_eq!(
            AnalyzerError::Timeout("DNS lookup".into()).to_string(),
            "DNS lookup timed out"
        );
        assert_eq!(
            AnalyzerError::Network("connection refused".into()).to_string(),
            "connection refused"
        );
    }

    #[test]
    fn test_integration_error_display() {
        let err = IntegrationError::Unconfigured("Payment provider");
        assert_eq!(err.to_string(), "Payment provider is not configured");
        let err = IntegrationError::upstream("Resend", "HTTP 500");
        assert_eq!(err.to_string(), "Resend request failed: HTTP 500");
    }
}
