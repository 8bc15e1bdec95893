//! Request identity: the client address used for rate limiting and the admin
//! secret check.

use std::net::SocketAddr;

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

use super::error::ApiError;
use super::types::AppState;
use crate::config::{HEADER_ADMIN_SECRET, HEADER_X_FORWARDED_FOR, HEADER_X_REAL_IP};

/// Key used when neither proxy headers nor the peer address are available.
const UNKNOWN_CLIENT: &str = "unknown";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Client address: first `X-Forwarded-For` entry, then `X-Real-IP`, then the
/// socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(first) = header_str(headers, HEADER_X_FORWARDED_FOR)
        .and_then(|list| list.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return first.to_string();
    }
    if let Some(real_ip) = header_str(headers, HEADER_X_REAL_IP) {
        return real_ip.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// `User-Agent` of the request, if readable.
pub fn user_agent(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, axum::http::header::USER_AGENT.as_str())
}

/// Fails with 403 unless the request carries the configured admin secret.
///
/// With no secret configured every request is refused.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_secret.as_deref() else {
        return Err(ApiError::Forbidden);
    };
    match headers.get(HEADER_ADMIN_SECRET).and_then(|v| v.to_str().ok()) {
        Some(given) if bool::from(given.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
        _ => {
            log::warn!("Rejected admin request with missing or wrong secret");
            Err(ApiError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer: SocketAddr = "192.0.2.1:5555".parse().unwrap();
        assert_eq!(
            client_ip(
                &headers(&[
                    ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
                    ("x-real-ip", "198.51.100.2")
                ]),
                Some(peer)
            ),
            "203.0.113.7"
        );
        assert_eq!(
            client_ip(&headers(&[("x-real-ip", "198.51.100.2")]), Some(peer)),
            "198.51.100.2"
        );
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "192.0.2.1");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }

    #[test]
    fn test_blank_forwarded_for_falls_through() {
        let peer: SocketAddr = "192.0.2.1:5555".parse().unwrap();
        assert_eq!(
            client_ip(&headers(&[("x-forwarded-for", " ")]), Some(peer)),
            "192.0.2.1"
        );
    }

    async fn state_with_secret(secret: Option<&str>) -> AppState {
        use std::sync::Arc;

        use crate::fetch::HttpFetcher;
        use crate::notify::{NoopEmailSender, Notifier, NotifierSettings};
        use crate::scan::ScanService;
        use crate::storage::test_helpers::create_test_pool;

        let pool = Arc::new(create_test_pool().await);
        let scanner = ScanService::new(
            Arc::new(HttpFetcher::new(Arc::new(reqwest::Client::new()))),
            Vec::new(),
        );
        let notifier = Arc::new(Notifier::start(
            Arc::new(NoopEmailSender),
            NotifierSettings {
                base_url: "https://api.example.com".to_string(),
                alert_email: None,
                queue_capacity: 4,
            },
        ));
        AppState::new(pool, scanner, notifier).with_admin_secret(secret.map(str::to_string))
    }

    #[tokio::test]
    async fn test_require_admin_compares_whole_secret() {
        let state = state_with_secret(Some("secret")).await;
        assert!(require_admin(&state, &headers(&[("x-admin-secret", "secret")])).is_ok());
        assert!(matches!(
            require_admin(&state, &headers(&[("x-admin-secret", "secreT")])),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            require_admin(&state, &headers(&[("x-admin-secret", "secret2")])),
            Err(ApiError::Forbidden)
        ));
        assert!(matches!(
            require_admin(&state, &HeaderMap::new()),
            Err(ApiError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_require_admin_without_configured_secret() {
        let state = state_with_secret(None).await;
        assert!(matches!(
            require_admin(&state, &headers(&[("x-admin-secret", "")])),
            Err(ApiError::Forbidden)
        ));
    }
}
