//! HTTP client initialization.
//!
//! Two clients are built: one for the scanned target, which must tolerate
//! broken TLS, and one for the email and payment APIs, which must not.

use std::sync::Arc;
use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{Config, MAX_REDIRECT_HOPS, SERVICE_NAME, SERVICE_VERSION};
use crate::error_handling::InitializationError;

/// Initializes the client used to fetch scan targets.
///
/// Creates a `reqwest::Client` configured with:
/// - User-Agent header from the config
/// - Connect and response timeouts from the config
/// - Redirect following (up to `MAX_REDIRECT_HOPS`)
/// - Certificate verification disabled, so expired or self-signed sites still
///   produce a response; the TLS analyzer reports on the certificate itself
///
/// # Errors
///
/// Returns `InitializationError::HttpClientError` if client creation fails.
pub fn init_client(config: &Config) -> Result<Arc<reqwest::Client>, InitializationError> {
    let client = ClientBuilder::new()
        .connect_timeout(config.connect_timeout())
        .timeout(config.fetch_timeout())
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECT_HOPS))
        .danger_accept_invalid_certs(true)
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(Arc::new(client))
}

/// Initializes the client for outbound integrations (email and payment APIs).
///
/// Certificates are verified. Individual calls set their own timeouts.
pub fn init_api_client() -> Result<reqwest::Client, InitializationError> {
    let client = ClientBuilder::new()
        .connect_timeout(Duration::from_secs(crate::config::TCP_CONNECT_TIMEOUT_SECS))
        .user_agent(format!("{SERVICE_NAME}/{SERVICE_VERSION}"))
        .build()?;
    Ok(client)
}
